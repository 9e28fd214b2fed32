//! In-memory [`SheetsApi`] used by tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::SheetsApi;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct State {
    /// Worksheets in creation order.
    order: Vec<String>,
    sheets: BTreeMap<String, Vec<Vec<String>>>,
    fail_status: Option<u16>,
}

/// A single fake spreadsheet. Clones share state.
#[derive(Debug, Clone)]
pub(crate) struct MemorySheetsApi {
    spreadsheet_id: String,
    state: Arc<Mutex<State>>,
}

impl MemorySheetsApi {
    /// A spreadsheet holding one empty default worksheet, like a new workbook.
    pub(crate) fn new(spreadsheet_id: &str) -> Self {
        let api = Self {
            spreadsheet_id: spreadsheet_id.to_string(),
            state: Arc::default(),
        };
        api.add_existing_sheet("Sheet1");
        api
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub(crate) fn add_existing_sheet(&self, title: &str) {
        let mut state = self.lock();
        state.order.push(title.to_string());
        state.sheets.insert(title.to_string(), Vec::new());
    }

    /// Make every following call fail with `status` until cleared.
    pub(crate) fn fail_with(&self, status: u16) {
        self.lock().fail_status = Some(status);
    }

    pub(crate) fn clear_failure(&self) {
        self.lock().fail_status = None;
    }

    pub(crate) fn titles(&self) -> Vec<String> {
        self.lock().order.clone()
    }

    pub(crate) fn rows(&self, title: &str) -> Vec<Vec<String>> {
        self.lock().sheets.get(title).cloned().unwrap_or_default()
    }

    /// Write a raw row, bypassing the storage layer.
    pub(crate) fn push_row(&self, title: &str, cells: &[&str]) {
        self.lock()
            .sheets
            .entry(title.to_string())
            .or_default()
            .push(cells.iter().map(|s| (*s).to_string()).collect());
    }

    fn check(&self, state: &State, spreadsheet_id: &str) -> Result<()> {
        if let Some(status) = state.fail_status {
            return Err(Error::from_status(status, format!("injected HTTP {status}")));
        }
        if spreadsheet_id != self.spreadsheet_id {
            return Err(Error::from_status(
                404,
                format!("spreadsheet {spreadsheet_id} not found"),
            ));
        }
        Ok(())
    }
}

/// Split `title!A:D` into the title and the number of columns it spans, or
/// `title!1:1` into the title and a row limit.
fn parse_range(range: &str) -> (&str, Option<usize>, Option<usize>) {
    let (title, cells) = range.split_once('!').unwrap_or((range, ""));
    let mut columns = None;
    let mut row_limit = None;
    if let Some((_, end)) = cells.split_once(':') {
        if let Ok(row) = end.parse::<usize>() {
            row_limit = Some(row);
        } else if let Some(last) = end.bytes().last() {
            columns = Some(usize::from(last.to_ascii_uppercase() - b'A') + 1);
        }
    }
    (title, columns, row_limit)
}

impl SheetsApi for MemorySheetsApi {
    fn sheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>> {
        let state = self.lock();
        self.check(&state, spreadsheet_id)?;
        Ok(state.order.clone())
    }

    fn add_sheet(&self, spreadsheet_id: &str, title: &str) -> Result<()> {
        let mut state = self.lock();
        self.check(&state, spreadsheet_id)?;
        if state.sheets.contains_key(title) {
            return Err(Error::from_status(400, format!("sheet {title} already exists")));
        }
        state.order.push(title.to_string());
        state.sheets.insert(title.to_string(), Vec::new());
        Ok(())
    }

    fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let state = self.lock();
        self.check(&state, spreadsheet_id)?;
        let (title, columns, row_limit) = parse_range(range);
        let rows = state
            .sheets
            .get(title)
            .ok_or_else(|| Error::from_status(400, format!("unable to parse range: {range}")))?;

        Ok(rows
            .iter()
            .take(row_limit.unwrap_or(usize::MAX))
            .map(|row| {
                let mut cells: Vec<String> =
                    row.iter().take(columns.unwrap_or(usize::MAX)).cloned().collect();
                // Like the real service, trailing empty cells are omitted.
                while cells.last().is_some_and(String::is_empty) {
                    cells.pop();
                }
                cells
            })
            .collect())
    }

    fn append_rows(&self, spreadsheet_id: &str, range: &str, rows: &[Vec<String>]) -> Result<()> {
        let mut state = self.lock();
        self.check(&state, spreadsheet_id)?;
        let (title, _, _) = parse_range(range);
        let sheet = state
            .sheets
            .get_mut(title)
            .ok_or_else(|| Error::from_status(400, format!("unable to parse range: {range}")))?;
        sheet.extend(rows.iter().cloned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("surveys!A:D"), ("surveys", Some(4), None));
        assert_eq!(parse_range("stories!A:B"), ("stories", Some(2), None));
        assert_eq!(parse_range("stories!1:1"), ("stories", None, Some(1)));
        assert_eq!(parse_range("stories"), ("stories", None, None));
    }

    #[test]
    fn test_get_values_drops_trailing_empty_cells() {
        let api = MemorySheetsApi::new("s");
        api.push_row("Sheet1", &["a", "", "c", "", ""]);
        api.push_row("Sheet1", &["", ""]);

        let rows = api.get_values("s", "Sheet1!A:E").unwrap();
        assert_eq!(rows, vec![vec!["a", "", "c"], Vec::<&str>::new()]);
    }
}
