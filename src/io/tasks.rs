use std::path::Path;
use std::sync::Arc;

use csv::ReaderBuilder;
use tracing::{debug, info};

use crate::error::FillerError;
use crate::matching::applicant::ApplicantData;
use crate::runner::task::FormTask;

const URL_COLUMNS: [&str; 2] = ["form_url", "url"];

fn input_error(path: &Path, message: impl ToString) -> FillerError {
    FillerError::Input {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

/// Read target URLs from CSV text.
///
/// The URL column is `form_url` or `url` when a header names one;
/// otherwise the first column. A first row that does not look like a URL
/// is taken to be a header. Blank cells are skipped.
pub fn parse_form_urls(content: &str) -> Result<Vec<String>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut column = 0;
    let mut urls = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if row == 0 {
            let cells: Vec<String> = record
                .iter()
                .map(|c| c.trim_start_matches('\u{feff}').trim().to_lowercase())
                .collect();
            if let Some(i) = cells.iter().position(|c| URL_COLUMNS.contains(&c.as_str())) {
                column = i;
                continue;
            }
            let first = cells.first().map(String::as_str).unwrap_or_default();
            if !first.starts_with("http://") && !first.starts_with("https://") {
                debug!(header = ?cells, "no url column named, using the first column");
                continue;
            }
        }
        if let Some(cell) = record.get(column).map(str::trim).filter(|c| !c.is_empty()) {
            urls.push(cell.trim_start_matches('\u{feff}').to_string());
        }
    }
    Ok(urls)
}

pub fn load_form_urls(path: &Path) -> Result<Vec<String>, FillerError> {
    let content = std::fs::read_to_string(path).map_err(|e| input_error(path, e))?;
    parse_form_urls(&content).map_err(|e| input_error(path, e))
}

/// Build the task list: one task per URL, all sharing one applicant record.
pub fn load_tasks(csv_path: &Path, data_path: &Path, limit: Option<usize>) -> Result<Vec<FormTask>, FillerError> {
    let urls = load_form_urls(csv_path)?;
    let data = Arc::new(ApplicantData::from_path(data_path)?);
    let take = limit.unwrap_or(usize::MAX);
    let tasks: Vec<FormTask> = urls
        .into_iter()
        .take(take)
        .enumerate()
        .map(|(index, url)| FormTask::new(url, data.clone(), index))
        .collect();
    info!(tasks = tasks.len(), csv = %csv_path.display(), "tasks loaded");
    Ok(tasks)
}
