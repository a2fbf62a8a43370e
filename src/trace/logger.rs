use std::{fs::OpenOptions, io::Write, path::Path, sync::Mutex};

use crate::trace::events::{EventRecord, RunEvent};

/// Append-only JSON-lines sink for [`RunEvent`]s.
///
/// Write failures print a warning and are otherwise ignored.
pub struct EventLog {
    file: Option<Mutex<std::fs::File>>,
}

impl EventLog {
    pub fn new(path: &Path) -> Self {
        let file = OpenOptions::new().create(true).append(true).open(path);

        match file {
            Ok(f) => Self {
                file: Some(Mutex::new(f)),
            },
            Err(e) => {
                eprintln!("Warning: could not open event file '{}': {}", path.display(), e);
                Self { file: None }
            }
        }
    }

    pub fn disabled() -> Self {
        Self { file: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    pub fn log(&self, event: &RunEvent) {
        let file_mutex = match &self.file {
            Some(f) => f,
            None => return,
        };

        let json = match serde_json::to_string(&EventRecord::now(event)) {
            Ok(j) => j,
            Err(e) => {
                eprintln!("Warning: failed to serialize run event: {}", e);
                return;
            }
        };

        let mut file = match file_mutex.lock() {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Warning: event log lock poisoned: {}", e);
                return;
            }
        };

        if let Err(e) = writeln!(file, "{}", json) {
            eprintln!("Warning: failed to write run event: {}", e);
        }
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog").field("enabled", &self.is_enabled()).finish()
    }
}
