use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FillerError;

/// One document in the page: index 0 is the main frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRef {
    pub index: usize,
    pub url: String,
}

/// How to pick an `<option>` natively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum OptionChoice {
    Label(String),
    Value(String),
    Index(usize),
}

/// Browser automation collaborator.
///
/// Every element-level call names the owning frame by index and the
/// element by the selector produced at extraction time. Native actions
/// may fail on scripted widgets; [`crate::browser::actions`] layers the
/// fallback chains on top.
#[async_trait]
pub trait BrowserDriver: Send {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), FillerError>;

    async fn frames(&mut self) -> Result<Vec<FrameRef>, FillerError>;

    /// Evaluate a JS function expression `(arg) => ...` in a frame.
    async fn evaluate(&mut self, frame: usize, script: &str, arg: Value) -> Result<Value, FillerError>;

    async fn fill(&mut self, frame: usize, selector: &str, value: &str) -> Result<(), FillerError>;

    async fn select_option(&mut self, frame: usize, selector: &str, choice: &OptionChoice) -> Result<(), FillerError>;

    async fn set_checked(&mut self, frame: usize, selector: &str, checked: bool) -> Result<(), FillerError>;

    async fn click(&mut self, frame: usize, selector: &str) -> Result<(), FillerError>;

    async fn wait_for_selector(&mut self, frame: usize, selector: &str, timeout: Duration) -> Result<(), FillerError>;

    /// Visible text of the main document.
    async fn page_text(&mut self) -> Result<String, FillerError>;

    async fn current_url(&mut self) -> Result<String, FillerError>;

    async fn wait_idle(&mut self, duration: Duration) -> Result<(), FillerError> {
        tokio::time::sleep(duration).await;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), FillerError> {
        Ok(())
    }
}

/// Opens one isolated browser context per form task.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowserDriver>, FillerError>;
}
