//! Storage layer for rs-backend.
//!
//! Survey responses and stories are persisted through a [`Storage`]
//! implementation chosen once at startup:
//!
//! - [`CsvStorage`]: two flat CSV files in a local directory.
//! - [`SheetsStorage`]: two worksheets in a Google Sheets workbook.
//!
//! Both are append-only. Every append is a single write at the medium's
//! granularity and every read is a full scan, so no cross-record locking is
//! needed when handlers call in concurrently.

pub mod csv;
pub mod sheets;

use std::sync::Arc;

use tracing::info;

use crate::config::{BackendKind, Config};
use crate::error::{Error, Result};
use crate::record::{StoryRecord, SurveyRecord};

pub use self::csv::CsvStorage;
pub use self::sheets::{HttpSheetsApi, SheetsApi, SheetsStorage};

/// Durable, append-only persistence for survey and story records.
///
/// All methods block. Callers on an async runtime must move them off the
/// reactor (see [`crate::server`]).
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Short backend name for logging.
    fn name(&self) -> &'static str;

    /// Append one survey response.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the medium rejects or fails the write.
    fn append_survey(&self, record: &SurveyRecord) -> Result<()>;

    /// Append one story.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the medium rejects or fails the write.
    fn append_story(&self, record: &StoryRecord) -> Result<()>;

    /// Read every survey response, oldest first.
    ///
    /// Rows too short to hold a record are skipped.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the medium cannot be read.
    fn read_all_surveys(&self) -> Result<Vec<SurveyRecord>>;

    /// Read every story, oldest first.
    ///
    /// Rows too short to hold a record are skipped.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the medium cannot be read.
    fn read_all_stories(&self) -> Result<Vec<StoryRecord>>;
}

/// Initialize the backend selected by `config` and return it.
///
/// This is the only place the backend variant is chosen. Initialization is
/// idempotent and validates the medium up front so that a misconfigured
/// deployment fails before it accepts traffic.
///
/// # Errors
///
/// Returns [`Error::ConfigurationInvalid`] when required settings are missing,
/// or a storage error when the medium cannot be prepared.
pub fn open_configured(config: &Config) -> Result<Arc<dyn Storage>> {
    match config.storage.backend {
        BackendKind::Csv => {
            let storage = CsvStorage::initialize(config.csv_data_dir())?;
            info!(data_dir = %storage.data_dir().display(), "Using CSV storage");
            Ok(Arc::new(storage))
        }
        BackendKind::Sheets => {
            let sheets = &config.storage.sheets;
            let credentials_path = sheets.credentials_path.as_deref().ok_or_else(|| {
                Error::config_invalid("storage.sheets.credentials_path is required")
            })?;
            let spreadsheet_id = sheets
                .spreadsheet_id
                .as_deref()
                .ok_or_else(|| Error::config_invalid("storage.sheets.spreadsheet_id is required"))?;

            let api = HttpSheetsApi::from_key_file(
                credentials_path,
                config.sheets_request_timeout(),
            )?;
            let storage = SheetsStorage::initialize(api, spreadsheet_id)?;
            info!(spreadsheet_id, "Using Google Sheets storage");
            Ok(Arc::new(storage))
        }
    }
}
