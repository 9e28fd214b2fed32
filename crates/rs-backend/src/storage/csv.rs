//! Flat-file storage: one CSV table per record kind.
//!
//! ```text
//! <data_dir>/surveys.csv   datetime_submitted,q_set_goal,q_made_progress,organization
//! <data_dir>/stories.csv   datetime_submitted,content
//! ```
//!
//! Each append encodes one row in memory and hands it to the OS in a single
//! `write_all` on a file opened with `O_APPEND`, so concurrent appends never
//! interleave within a row.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::Storage;
use crate::error::{Error, Result};
use crate::record::{StoryRecord, SurveyRecord};

/// File name of the survey table.
pub const SURVEYS_FILE: &str = "surveys.csv";

/// File name of the story table.
pub const STORIES_FILE: &str = "stories.csv";

/// CSV-backed storage rooted at a data directory.
#[derive(Debug, Clone)]
pub struct CsvStorage {
    data_dir: PathBuf,
    surveys_file: PathBuf,
    stories_file: PathBuf,
}

impl CsvStorage {
    /// Create the data directory and any missing table, then open it.
    ///
    /// Existing tables are left untouched, so calling this repeatedly on the
    /// same directory never duplicates headers or loses rows.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the directory or a table cannot be created.
    pub fn initialize(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();

        fs::create_dir_all(&data_dir).map_err(|e| {
            Error::unavailable(format!(
                "failed to create data directory {}: {e}",
                data_dir.display()
            ))
        })?;

        let storage = Self {
            surveys_file: data_dir.join(SURVEYS_FILE),
            stories_file: data_dir.join(STORIES_FILE),
            data_dir,
        };

        ensure_table(&storage.surveys_file, &SurveyRecord::FIELDS)?;
        ensure_table(&storage.stories_file, &StoryRecord::FIELDS)?;

        debug!("CSV storage ready at {}", storage.data_dir.display());
        Ok(storage)
    }

    /// Directory holding the tables.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the survey table.
    #[must_use]
    pub fn surveys_file(&self) -> &Path {
        &self.surveys_file
    }

    /// Path of the story table.
    #[must_use]
    pub fn stories_file(&self) -> &Path {
        &self.stories_file
    }
}

impl Storage for CsvStorage {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn append_survey(&self, record: &SurveyRecord) -> Result<()> {
        info!(
            datetime_submitted = %record.datetime_submitted,
            q_set_goal = %record.q_set_goal,
            q_made_progress = %record.q_made_progress,
            organization = %record.organization,
            "Saving survey response"
        );
        append_row(&self.surveys_file, &record.to_row())
    }

    fn append_story(&self, record: &StoryRecord) -> Result<()> {
        info!(
            datetime_submitted = %record.datetime_submitted,
            content_len = record.content.len(),
            "Saving story"
        );
        append_row(&self.stories_file, &record.to_row())
    }

    fn read_all_surveys(&self) -> Result<Vec<SurveyRecord>> {
        let rows = read_rows(&self.surveys_file)?;
        let surveys = collect_records(rows, SurveyRecord::from_row, &self.surveys_file);
        debug!("Read {} survey responses", surveys.len());
        Ok(surveys)
    }

    fn read_all_stories(&self) -> Result<Vec<StoryRecord>> {
        let rows = read_rows(&self.stories_file)?;
        let stories = collect_records(rows, StoryRecord::from_row, &self.stories_file);
        debug!("Read {} stories", stories.len());
        Ok(stories)
    }
}

/// Write the header row to `path` unless the file already holds data.
///
/// An existing but empty file (left by a crash before the header was written,
/// or truncated by hand) gets the header too.
fn ensure_table(path: &Path, header: &[&str]) -> Result<()> {
    let file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            let len = fs::metadata(path)
                .map_err(|e| Error::from_medium_io(&e, &format!("stat {}", path.display())))?
                .len();
            if len > 0 {
                return Ok(());
            }
            warn!("Table {} is empty, writing header", path.display());
            OpenOptions::new()
                .append(true)
                .open(path)
                .map_err(|e| Error::from_medium_io(&e, &format!("open {}", path.display())))?
        }
        Err(e) => {
            return Err(Error::unavailable(format!(
                "failed to create {}: {e}",
                path.display()
            )))
        }
    };

    write_encoded(file, header, path)?;
    info!("Created table {}", path.display());
    Ok(())
}

fn append_row(path: &Path, row: &[&str]) -> Result<()> {
    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| Error::from_medium_io(&e, &format!("open {}", path.display())))?;
    write_encoded(file, row, path)
}

/// Encode `row` as one CSV line and write it with a single call.
fn write_encoded(mut file: File, row: &[&str], path: &Path) -> Result<()> {
    let mut encoder = ::csv::Writer::from_writer(Vec::new());
    encoder
        .write_record(row)
        .map_err(|e| Error::internal(format!("failed to encode CSV row: {e}")))?;
    let line = encoder
        .into_inner()
        .map_err(|e| Error::internal(format!("failed to encode CSV row: {e}")))?;

    file.write_all(&line)
        .and_then(|()| file.flush())
        .map_err(|e| Error::from_medium_io(&e, &format!("write {}", path.display())))
}

/// Read every data row of a table; a missing file reads as empty.
fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(Error::from_medium_io(
                &e,
                &format!("open {}", path.display()),
            ))
        }
    };

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let mut rows = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
            Err(e) if e.is_io_error() => {
                return Err(Error::unavailable(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
            Err(e) => warn!("Skipping unreadable row in {}: {e}", path.display()),
        }
    }
    Ok(rows)
}

fn collect_records<T>(
    rows: Vec<Vec<String>>,
    parse: impl Fn(&[String]) -> Option<T>,
    path: &Path,
) -> Vec<T> {
    let mut skipped = 0usize;
    let records: Vec<T> = rows
        .iter()
        .filter_map(|row| {
            let parsed = parse(row);
            if parsed.is_none() {
                skipped += 1;
            }
            parsed
        })
        .collect();
    if skipped > 0 {
        warn!("Skipped {skipped} incomplete rows in {}", path.display());
    }
    records
}
