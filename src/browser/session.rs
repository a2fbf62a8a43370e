use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use crate::browser::driver::{BrowserDriver, DriverFactory, FrameRef, OptionChoice};
use crate::error::FillerError;

/// Default location of the Playwright driver script.
pub const DEFAULT_DRIVER_SCRIPT: &str = "node/driver_server.js";

/// Slack added on top of a browser-side timeout before the pipe read gives up.
const PIPE_SLACK: Duration = Duration::from_secs(5);

/// How long a quitting driver gets to exit before it is killed.
const EXIT_GRACE: Duration = Duration::from_secs(3);

/// Request sent to driver_server.js over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum SessionRequest<'a> {
    Navigate { url: &'a str, timeout_ms: u64 },
    Frames,
    Evaluate { frame: usize, script: &'a str, arg: Value },
    Fill { frame: usize, selector: &'a str, value: &'a str },
    SelectOption { frame: usize, selector: &'a str, choice: &'a OptionChoice },
    SetChecked { frame: usize, selector: &'a str, checked: bool },
    Click { frame: usize, selector: &'a str },
    WaitForSelector { frame: usize, selector: &'a str, timeout_ms: u64 },
    PageText,
    CurrentUrl,
    Quit,
}

impl SessionRequest<'_> {
    fn name(&self) -> &'static str {
        match self {
            SessionRequest::Navigate { .. } => "navigate",
            SessionRequest::Frames => "frames",
            SessionRequest::Evaluate { .. } => "evaluate",
            SessionRequest::Fill { .. } => "fill",
            SessionRequest::SelectOption { .. } => "select_option",
            SessionRequest::SetChecked { .. } => "set_checked",
            SessionRequest::Click { .. } => "click",
            SessionRequest::WaitForSelector { .. } => "wait_for_selector",
            SessionRequest::PageText => "page_text",
            SessionRequest::CurrentUrl => "current_url",
            SessionRequest::Quit => "quit",
        }
    }
}

/// Response received from driver_server.js over stdout (one JSON line).
#[derive(Debug, Deserialize)]
pub struct SessionResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub frames: Option<Vec<FrameRef>>,
}

/// A browser context backed by one long-lived Node.js/Playwright process.
///
/// Commands go out as NDJSON on stdin, responses come back one line each
/// on stdout. Each form task owns its own session.
pub struct NodeSession {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    command_timeout: Duration,
    closed: bool,
    /// Set once a read timed out or a reply could not be decoded. The pipe
    /// may still carry a late answer, so no further command is sent.
    poisoned: bool,
}

impl NodeSession {
    /// Spawn driver_server.js and wait for its ready line.
    pub async fn launch(script: &Path, headless: bool, command_timeout: Duration) -> Result<Self, FillerError> {
        let script_name = script.display().to_string();
        let mut child = Command::new("node")
            .arg(script)
            .env("HEADLESS", if headless { "1" } else { "0" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FillerError::SubprocessSpawn {
                script: script_name.clone(),
                source: e,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            FillerError::SessionIO(format!("failed to capture stdin of {}", script_name))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            FillerError::SessionIO(format!("failed to capture stdout of {}", script_name))
        })?;

        let mut session = NodeSession {
            child,
            stdin,
            reader: BufReader::new(stdout),
            command_timeout,
            closed: false,
            poisoned: false,
        };

        let response = session.read_response("launch", command_timeout + PIPE_SLACK).await?;
        if !response.ok || response.ready != Some(true) {
            return Err(FillerError::SessionProtocol {
                command: "launch".into(),
                error: format!("no ready signal from {}", script_name),
            });
        }
        debug!(script = %script_name, "browser session ready");
        Ok(session)
    }

    async fn read_response(&mut self, command: &str, limit: Duration) -> Result<SessionResponse, FillerError> {
        let started = Instant::now();
        let mut line = String::new();
        let read = match tokio::time::timeout(limit, self.reader.read_line(&mut line)).await {
            Ok(read) => read,
            Err(_) => {
                self.poisoned = true;
                warn!(command, "driver did not answer in time; session abandoned");
                return Err(FillerError::timeout(command, started.elapsed()));
            }
        };
        if let Err(e) = read {
            self.poisoned = true;
            return Err(FillerError::SessionIO(format!("failed to read driver stdout: {}", e)));
        }

        if line.trim().is_empty() {
            self.poisoned = true;
            return Err(FillerError::SessionIO(
                "empty response from driver (process may have died)".into(),
            ));
        }
        serde_json::from_str(line.trim()).map_err(|e| {
            self.poisoned = true;
            FillerError::JsonParse {
                context: format!("driver response to {}", command),
                source: e,
            }
        })
    }

    async fn send(&mut self, request: &SessionRequest<'_>, limit: Duration) -> Result<SessionResponse, FillerError> {
        if self.poisoned {
            return Err(FillerError::timeout(
                &format!("{} (session abandoned after an earlier failure)", request.name()),
                Duration::ZERO,
            ));
        }
        let json = serde_json::to_string(request).map_err(|e| FillerError::JsonSerialize {
            context: "SessionRequest".into(),
            source: e,
        })?;

        self.stdin
            .write_all(format!("{}\n", json).as_bytes())
            .await
            .map_err(|e| FillerError::SessionIO(format!("failed to write driver stdin: {}", e)))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| FillerError::SessionIO(format!("failed to flush driver stdin: {}", e)))?;

        self.read_response(request.name(), limit).await
    }

    /// Send a request and verify it succeeded.
    async fn send_ok(&mut self, request: &SessionRequest<'_>) -> Result<SessionResponse, FillerError> {
        let limit = match request {
            SessionRequest::Navigate { timeout_ms, .. } | SessionRequest::WaitForSelector { timeout_ms, .. } => {
                Duration::from_millis(*timeout_ms) + PIPE_SLACK
            }
            _ => self.command_timeout + PIPE_SLACK,
        };
        let response = self.send(request, limit).await?;
        if !response.ok {
            return Err(FillerError::SessionProtocol {
                command: request.name().into(),
                error: response.error.unwrap_or_else(|| "unknown error".into()),
            });
        }
        Ok(response)
    }

    /// Whether an earlier timeout or garbled reply disabled this session.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    async fn quit(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if !self.poisoned {
            // The process may already be gone.
            let _ = self.send(&SessionRequest::Quit, PIPE_SLACK).await;
        }
        match tokio::time::timeout(EXIT_GRACE, self.child.wait()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "driver process did not exit cleanly"),
            Err(_) => {
                warn!("driver process still running; killing it");
                if let Err(e) = self.child.kill().await {
                    warn!(error = %e, "driver process could not be killed");
                }
            }
        }
    }
}

#[async_trait]
impl BrowserDriver for NodeSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), FillerError> {
        let timeout_ms = timeout.as_millis() as u64;
        self.send_ok(&SessionRequest::Navigate { url, timeout_ms }).await?;
        Ok(())
    }

    async fn frames(&mut self) -> Result<Vec<FrameRef>, FillerError> {
        let response = self.send_ok(&SessionRequest::Frames).await?;
        Ok(response.frames.unwrap_or_default())
    }

    async fn evaluate(&mut self, frame: usize, script: &str, arg: Value) -> Result<Value, FillerError> {
        let response = self.send_ok(&SessionRequest::Evaluate { frame, script, arg }).await?;
        Ok(response.data.unwrap_or(Value::Null))
    }

    async fn fill(&mut self, frame: usize, selector: &str, value: &str) -> Result<(), FillerError> {
        self.send_ok(&SessionRequest::Fill { frame, selector, value }).await?;
        Ok(())
    }

    async fn select_option(&mut self, frame: usize, selector: &str, choice: &OptionChoice) -> Result<(), FillerError> {
        self.send_ok(&SessionRequest::SelectOption { frame, selector, choice }).await?;
        Ok(())
    }

    async fn set_checked(&mut self, frame: usize, selector: &str, checked: bool) -> Result<(), FillerError> {
        self.send_ok(&SessionRequest::SetChecked { frame, selector, checked }).await?;
        Ok(())
    }

    async fn click(&mut self, frame: usize, selector: &str) -> Result<(), FillerError> {
        self.send_ok(&SessionRequest::Click { frame, selector }).await?;
        Ok(())
    }

    async fn wait_for_selector(&mut self, frame: usize, selector: &str, timeout: Duration) -> Result<(), FillerError> {
        let timeout_ms = timeout.as_millis() as u64;
        self.send_ok(&SessionRequest::WaitForSelector { frame, selector, timeout_ms }).await?;
        Ok(())
    }

    async fn page_text(&mut self) -> Result<String, FillerError> {
        let response = self.send_ok(&SessionRequest::PageText).await?;
        Ok(response.text.unwrap_or_default())
    }

    async fn current_url(&mut self) -> Result<String, FillerError> {
        let response = self.send_ok(&SessionRequest::CurrentUrl).await?;
        response.url.ok_or_else(|| FillerError::SessionProtocol {
            command: "current_url".into(),
            error: "no url in response".into(),
        })
    }

    async fn close(&mut self) -> Result<(), FillerError> {
        self.quit().await;
        Ok(())
    }
}

/// Spawns a fresh [`NodeSession`] (own browser context) per task.
#[derive(Debug, Clone)]
pub struct NodeDriverFactory {
    pub script: PathBuf,
    pub headless: bool,
    pub command_timeout: Duration,
}

impl NodeDriverFactory {
    pub fn new(script: impl Into<PathBuf>, headless: bool, command_timeout: Duration) -> Self {
        Self {
            script: script.into(),
            headless,
            command_timeout,
        }
    }
}

#[async_trait]
impl DriverFactory for NodeDriverFactory {
    async fn open(&self) -> Result<Box<dyn BrowserDriver>, FillerError> {
        let session = NodeSession::launch(&self.script, self.headless, self.command_timeout).await?;
        Ok(Box::new(session))
    }
}
