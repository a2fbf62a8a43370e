use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FillerError {
    /// Node.js driver process failed to spawn
    #[error("Failed to spawn {script} (is Node.js installed?): {source}")]
    SubprocessSpawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from / writing to the driver process failed
    #[error("Driver session I/O: {0}")]
    SessionIO(String),

    /// Driver answered `ok: false` or an unexpected payload
    #[error("Driver command '{command}' failed: {error}")]
    SessionProtocol { command: String, error: String },

    /// JSON parsing failed (driver output, extraction payload)
    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization failed (driver command)
    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A navigation or selector wait exceeded its budget
    #[error("Timed out after {elapsed:?} during {operation}")]
    Timeout { operation: String, elapsed: Duration },

    /// Browser action reported failure
    #[error("Browser action failed: {0}")]
    BrowserAction(String),

    /// Element not found in the page
    #[error("Element '{selector}' not found: {context}")]
    ElementNotFound { selector: String, context: String },

    /// Lexicon file could not be read or compiled
    #[error("Lexicon error: {0}")]
    Lexicon(String),

    /// Task list / applicant data could not be loaded
    #[error("Input error ({path}): {message}")]
    Input { path: String, message: String },

    /// Result file could not be written
    #[error("Result output error: {0}")]
    Output(String),

    /// Page could not be fetched for a preflight run
    #[error("Fetch failed for {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FillerError {
    pub fn timeout(operation: &str, elapsed: Duration) -> Self {
        FillerError::Timeout {
            operation: operation.to_string(),
            elapsed,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            FillerError::Timeout { .. } => true,
            FillerError::SessionProtocol { error, .. } => {
                error.contains("Timeout") || error.contains("timeout")
            }
            _ => false,
        }
    }
}
