use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::error::FillerError;
use crate::runner::pool::ResultSink;
use crate::runner::task::{CSV_HEADER, FormResult};

/// Streams results to a CSV file, one flushed row per task.
pub struct CsvResultWriter {
    writer: Writer<File>,
}

impl CsvResultWriter {
    /// Create (or truncate) `path`, creating parent directories, and write
    /// the header row.
    pub fn create(path: &Path) -> Result<Self, FillerError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| FillerError::Output(format!("cannot create {}: {}", parent.display(), e)))?;
        }
        let mut writer = Writer::from_path(path)
            .map_err(|e| FillerError::Output(format!("cannot open {}: {}", path.display(), e)))?;
        writer
            .write_record(CSV_HEADER)
            .map_err(|e| FillerError::Output(e.to_string()))?;
        writer.flush().map_err(|e| FillerError::Output(e.to_string()))?;
        Ok(CsvResultWriter { writer })
    }
}

impl ResultSink for CsvResultWriter {
    fn record(&mut self, result: &FormResult) -> Result<(), FillerError> {
        self.writer
            .write_record(result.to_csv_row())
            .map_err(|e| FillerError::Output(e.to_string()))?;
        self.writer
            .flush()
            .map_err(|e| FillerError::Output(e.to_string()))
    }
}
