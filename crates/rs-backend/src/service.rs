//! Operations exposed to clients, independent of transport.
//!
//! Both the HTTP server and the CLI drive the same [`SurveyService`], which
//! stamps submissions, persists them and builds reports from a full read.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::Result;
use crate::record::{format_timestamp, StoryCreate, StoryRecord, SurveyRecord, SurveySubmission};
use crate::report::{aggregate, SurveyReport};
use crate::storage::Storage;

/// Acknowledgement returned for an accepted survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Human-readable confirmation.
    pub message: String,
    /// Always `"ok"`.
    pub status: String,
}

impl Ack {
    fn survey_submitted() -> Self {
        Self {
            message: "Survey submitted successfully".to_string(),
            status: "ok".to_string(),
        }
    }
}

/// Survey and story operations over a shared storage backend.
#[derive(Debug, Clone)]
pub struct SurveyService {
    storage: Arc<dyn Storage>,
}

impl SurveyService {
    /// Wrap an initialized storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// The underlying storage.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Stamp and persist a survey response.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the append fails; nothing is persisted.
    pub fn submit_survey(&self, submission: SurveySubmission) -> Result<Ack> {
        self.submit_survey_at(submission, Utc::now())
    }

    /// [`Self::submit_survey`] with an explicit submission time.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the append fails.
    pub fn submit_survey_at(&self, submission: SurveySubmission, at: DateTime<Utc>) -> Result<Ack> {
        let record = SurveyRecord::new(format_timestamp(at), submission);
        self.storage.append_survey(&record).inspect_err(|e| {
            error!(backend = self.storage.name(), "Failed to save survey response: {e}");
        })?;
        Ok(Ack::survey_submitted())
    }

    /// Build the report from every stored response.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the responses cannot be read.
    pub fn get_survey_report(&self) -> Result<SurveyReport> {
        let records = self.storage.read_all_surveys().inspect_err(|e| {
            error!(backend = self.storage.name(), "Failed to read survey responses: {e}");
        })?;
        let report = aggregate(&records);
        debug!(total_responses = report.total_responses, "Built survey report");
        Ok(report)
    }

    /// Stamp and persist a story, returning what was stored.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the append fails.
    pub fn submit_story(&self, story: StoryCreate) -> Result<StoryRecord> {
        self.submit_story_at(story, Utc::now())
    }

    /// [`Self::submit_story`] with an explicit submission time.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the append fails.
    pub fn submit_story_at(&self, story: StoryCreate, at: DateTime<Utc>) -> Result<StoryRecord> {
        let record = StoryRecord::new(format_timestamp(at), story.content);
        self.storage.append_story(&record).inspect_err(|e| {
            error!(backend = self.storage.name(), "Failed to save story: {e}");
        })?;
        Ok(record)
    }

    /// Every stored story, oldest first.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the stories cannot be read.
    pub fn list_stories(&self) -> Result<Vec<StoryRecord>> {
        self.storage.read_all_stories().inspect_err(|e| {
            error!(backend = self.storage.name(), "Failed to read stories: {e}");
        })
    }
}
