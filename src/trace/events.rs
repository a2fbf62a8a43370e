use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;

/// One line of the `--emit-json` event stream.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    pub timestamp_ms: i64,
    #[serde(flatten)]
    pub event: &'a RunEvent,
}

impl<'a> EventRecord<'a> {
    pub fn now(event: &'a RunEvent) -> Self {
        Self {
            timestamp_ms: Utc::now().timestamp_millis(),
            event,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    TaskStarted {
        index: usize,
        url: String,
    },
    FieldsMapped {
        index: usize,
        url: String,
        /// logical key -> selector
        mapped: BTreeMap<String, String>,
        unmapped: Vec<String>,
        rejected: usize,
    },
    SelectResolved {
        index: usize,
        selector: String,
        kind: String,
        label: String,
        via: String,
    },
    CaptchaDetected {
        index: usize,
        kind: String,
        solved: bool,
    },
    TaskFinished {
        index: usize,
        url: String,
        status: String,
        note: String,
    },
}
