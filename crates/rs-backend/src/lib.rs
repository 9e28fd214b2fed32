//! `rs-backend` - Survey and story collection service
//!
//! This library provides the record types, report aggregation and the
//! pluggable storage backends (local CSV files or a Google Sheets workbook)
//! behind the `rs-backend` HTTP server and CLI.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod record;
pub mod report;
pub mod server;
pub mod service;
pub mod storage;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use logging::init_logging;
pub use record::{Organization, StoryCreate, StoryRecord, SurveyRecord, SurveySubmission, YesNo};
pub use report::{aggregate, SurveyReport};
pub use service::{Ack, SurveyService};
pub use storage::{open_configured, Storage};
