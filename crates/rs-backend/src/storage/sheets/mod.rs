//! Google Sheets storage.
//!
//! Records live in two worksheets of one spreadsheet, `surveys` and
//! `stories`, each with a header row. Appends use the values-append call with
//! `INSERT_ROWS`, which the service applies atomically per request, so no
//! client-side locking is needed.
//!
//! The transport is abstracted behind [`SheetsApi`] so the storage logic can
//! be exercised without network access.

mod http;
#[cfg(test)]
pub(crate) mod memory;

use tracing::{debug, info};

use super::Storage;
use crate::error::Result;
use crate::record::{StoryRecord, SurveyRecord};

pub use self::http::{HttpSheetsApi, ServiceAccountKey};

/// Worksheet holding survey responses.
pub const SURVEYS_SHEET: &str = "surveys";

/// Worksheet holding stories.
pub const STORIES_SHEET: &str = "stories";

/// Minimal slice of the Sheets API the storage needs.
///
/// Implementations map remote failures through
/// [`crate::error::Error::from_status`] so that 403 and 404 keep their meaning.
pub trait SheetsApi: Send + Sync + std::fmt::Debug {
    /// Titles of every worksheet in the spreadsheet.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the spreadsheet cannot be fetched.
    fn sheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>>;

    /// Add an empty worksheet.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the worksheet cannot be created.
    fn add_sheet(&self, spreadsheet_id: &str, title: &str) -> Result<()>;

    /// Read the cells of an A1 range, row by row.
    ///
    /// Trailing empty cells are omitted by the service, so rows may be ragged.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the range cannot be read.
    fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>>;

    /// Append rows after the last non-empty row of a range, stored verbatim.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the append is rejected.
    fn append_rows(&self, spreadsheet_id: &str, range: &str, rows: &[Vec<String>]) -> Result<()>;
}

/// One worksheet and the columns it holds.
#[derive(Debug, Clone, Copy)]
struct Table {
    title: &'static str,
    header: &'static [&'static str],
    /// Full data range, e.g. `surveys!A:D`.
    data_range: &'static str,
    /// Range an append is anchored on.
    append_range: &'static str,
}

const SURVEYS: Table = Table {
    title: SURVEYS_SHEET,
    header: &SurveyRecord::FIELDS,
    data_range: "surveys!A:D",
    append_range: "surveys!A:A",
};

const STORIES: Table = Table {
    title: STORIES_SHEET,
    header: &StoryRecord::FIELDS,
    data_range: "stories!A:B",
    append_range: "stories!A:A",
};

/// Spreadsheet-backed storage.
#[derive(Debug)]
pub struct SheetsStorage<A = HttpSheetsApi> {
    api: A,
    spreadsheet_id: String,
}

impl<A: SheetsApi> SheetsStorage<A> {
    /// Verify the spreadsheet is reachable, then create any missing worksheet
    /// and header row.
    ///
    /// Safe to call against an already prepared spreadsheet.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::StorageNotFound`] for an unknown
    /// spreadsheet, [`crate::error::Error::StoragePermissionDenied`] when the
    /// service account lacks access, or another storage error.
    pub fn initialize(api: A, spreadsheet_id: impl Into<String>) -> Result<Self> {
        let storage = Self {
            api,
            spreadsheet_id: spreadsheet_id.into(),
        };

        let titles = storage.api.sheet_titles(&storage.spreadsheet_id)?;
        for table in [SURVEYS, STORIES] {
            storage.ensure_table(&table, &titles)?;
        }

        debug!(spreadsheet_id = %storage.spreadsheet_id, "Spreadsheet storage ready");
        Ok(storage)
    }

    /// Identifier of the backing spreadsheet.
    #[must_use]
    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn ensure_table(&self, table: &Table, existing: &[String]) -> Result<()> {
        if !existing.iter().any(|t| t == table.title) {
            self.api.add_sheet(&self.spreadsheet_id, table.title)?;
            info!("Created worksheet {}", table.title);
        }

        let first_row = format!("{}!1:1", table.title);
        let header = self.api.get_values(&self.spreadsheet_id, &first_row)?;
        if header.iter().all(Vec::is_empty) {
            let row: Vec<String> = table.header.iter().map(|s| (*s).to_string()).collect();
            self.api
                .append_rows(&self.spreadsheet_id, table.append_range, &[row])?;
            info!("Wrote header row to worksheet {}", table.title);
        }
        Ok(())
    }

    fn append(&self, table: &Table, row: &[&str]) -> Result<()> {
        let row: Vec<String> = row.iter().map(|s| (*s).to_string()).collect();
        self.api
            .append_rows(&self.spreadsheet_id, table.append_range, &[row])
    }

    /// All data rows of a table, header removed.
    fn data_rows(&self, table: &Table) -> Result<Vec<Vec<String>>> {
        let mut rows = self.api.get_values(&self.spreadsheet_id, table.data_range)?;
        if !rows.is_empty() {
            rows.remove(0);
        }
        Ok(rows)
    }
}

/// Parse a story row as returned by the service.
///
/// The service drops trailing empty cells, so a story with empty content comes
/// back as a lone timestamp. Rows with no cells at all are still skipped.
fn story_from_row(row: &[String]) -> Option<StoryRecord> {
    match row {
        [ts] => Some(StoryRecord::new(ts.clone(), String::new())),
        _ => StoryRecord::from_row(row),
    }
}

impl<A: SheetsApi> Storage for SheetsStorage<A> {
    fn name(&self) -> &'static str {
        "sheets"
    }

    fn append_survey(&self, record: &SurveyRecord) -> Result<()> {
        info!(
            datetime_submitted = %record.datetime_submitted,
            q_set_goal = %record.q_set_goal,
            q_made_progress = %record.q_made_progress,
            organization = %record.organization,
            "Saving survey response"
        );
        self.append(&SURVEYS, &record.to_row())
    }

    fn append_story(&self, record: &StoryRecord) -> Result<()> {
        info!(
            datetime_submitted = %record.datetime_submitted,
            content_len = record.content.len(),
            "Saving story"
        );
        self.append(&STORIES, &record.to_row())
    }

    fn read_all_surveys(&self) -> Result<Vec<SurveyRecord>> {
        let rows = self.data_rows(&SURVEYS)?;
        let total = rows.len();
        let surveys: Vec<SurveyRecord> = rows
            .iter()
            .filter_map(|row| SurveyRecord::from_row(row.as_slice()))
            .collect();
        if surveys.len() < total {
            debug!("Skipped {} incomplete survey rows", total - surveys.len());
        }
        Ok(surveys)
    }

    fn read_all_stories(&self) -> Result<Vec<StoryRecord>> {
        let rows = self.data_rows(&STORIES)?;
        let total = rows.len();
        let stories: Vec<StoryRecord> = rows
            .iter()
            .filter_map(|row| story_from_row(row))
            .collect();
        if stories.len() < total {
            debug!("Skipped {} incomplete story rows", total - stories.len());
        }
        Ok(stories)
    }
}
