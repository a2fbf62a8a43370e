use std::fmt;
use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::matching::applicant::ApplicantData;

/// One form to fill: target URL, applicant record and ordinal.
#[derive(Debug, Clone)]
pub struct FormTask {
    pub form_url: String,
    pub data: Arc<ApplicantData>,
    pub index: usize,
}

impl FormTask {
    pub fn new(form_url: impl Into<String>, data: Arc<ApplicantData>, index: usize) -> Self {
        FormTask {
            form_url: form_url.into(),
            data,
            index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormStatus {
    Ok,
    DryRun,
    SubmitFail,
    Timeout,
    CaptchaFail,
    Error,
}

impl FormStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FormStatus::Ok => "OK",
            FormStatus::DryRun => "DRY_RUN",
            FormStatus::SubmitFail => "SUBMIT_FAIL",
            FormStatus::Timeout => "TIMEOUT",
            FormStatus::CaptchaFail => "CAPTCHA_FAIL",
            FormStatus::Error => "ERROR",
        }
    }

    /// Every status, in report order.
    pub fn all() -> [FormStatus; 6] {
        [
            FormStatus::Ok,
            FormStatus::DryRun,
            FormStatus::SubmitFail,
            FormStatus::Timeout,
            FormStatus::CaptchaFail,
            FormStatus::Error,
        ]
    }
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of one [`FormTask`]. Exactly one per task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormResult {
    #[serde(skip)]
    pub index: usize,
    pub form_url: String,
    pub status: FormStatus,
    pub note: String,
    pub timestamp: String,
    pub unmapped_fields: Vec<String>,
}

pub const CSV_HEADER: [&str; 5] = ["form_url", "status", "note", "timestamp", "unmapped_fields"];

/// Separator for `unmapped_fields` inside one CSV cell.
pub const UNMAPPED_SEPARATOR: &str = ";";

impl FormResult {
    pub fn new(task: &FormTask, status: FormStatus, note: impl Into<String>, unmapped_fields: Vec<String>) -> Self {
        FormResult {
            index: task.index,
            form_url: task.form_url.clone(),
            status,
            note: note.into(),
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            unmapped_fields,
        }
    }

    /// Result for a task that was never started because the run stopped.
    pub fn cancelled(task: &FormTask) -> Self {
        Self::new(task, FormStatus::Error, "cancelled", Vec::new())
    }

    pub fn to_csv_row(&self) -> [String; 5] {
        [
            self.form_url.clone(),
            self.status.to_string(),
            self.note.clone(),
            self.timestamp.clone(),
            self.unmapped_fields.join(UNMAPPED_SEPARATOR),
        ]
    }
}
