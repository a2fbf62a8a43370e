use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::captcha::{CaptchaHandler, CaptchaProvider, RetryPolicy};
use crate::error::FillerError;
use crate::lexicon::Lexicon;
use crate::matching::ScoringConfig;
use crate::trace::EventLog;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "form-filler",
    version,
    about = "Fill and submit contact forms from a URL list"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Path to config file (default: form-filler.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fill every form listed in a CSV file
    Run {
        /// CSV of form URLs (`form_url` or `url` column, else first column)
        #[arg(long)]
        csv: PathBuf,

        /// Applicant data YAML
        #[arg(long)]
        data: PathBuf,

        /// Result CSV path
        #[arg(short, long, default_value = "result.csv")]
        output: PathBuf,

        /// Parallel browser contexts (overrides config)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-navigation timeout in seconds (overrides config)
        #[arg(long)]
        timeout: Option<u64>,

        /// CAPTCHA provider: none, anticaptcha, 2captcha, capsolver
        #[arg(long)]
        captcha_api: Option<CaptchaProvider>,

        /// Fill but never submit
        #[arg(long)]
        dry_run: bool,

        /// Show the browser window
        #[arg(long)]
        show_browser: bool,

        /// Process only the first N tasks
        #[arg(long)]
        limit: Option<usize>,

        /// Write a JSON-lines event stream to this file
        #[arg(long)]
        emit_json: Option<PathBuf>,

        /// Driver script for the Node.js browser session
        #[arg(long)]
        driver_script: Option<PathBuf>,
    },

    /// Preview field mapping and choices for one page without a browser
    Map {
        /// Local HTML file
        #[arg(long, conflicts_with = "url", required_unless_present = "url")]
        html: Option<PathBuf>,

        /// Fetch the page over HTTP instead
        #[arg(long)]
        url: Option<String>,

        /// Applicant data YAML
        #[arg(long)]
        data: PathBuf,

        /// CSS selector restricting the scan
        #[arg(long)]
        scope: Option<String>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `form-filler.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub run: RunSettings,
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// External lexicon replacing the built-in one.
    #[serde(default)]
    pub lexicon_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub headless: Option<bool>,

    #[serde(default)]
    pub captcha: CaptchaProvider,

    #[serde(default)]
    pub captcha_retry: RetryPolicy,

    /// Also check one optional category/type checkbox.
    #[serde(default)]
    pub optin: bool,

    /// Wait after clicking submit before reading the page.
    #[serde(default = "default_submit_wait_ms")]
    pub submit_wait_ms: u64,

    /// CSS selector restricting extraction.
    #[serde(default)]
    pub scope: Option<String>,

    #[serde(default)]
    pub driver_script: Option<String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            dry_run: false,
            headless: None,
            captcha: CaptchaProvider::None,
            captcha_retry: RetryPolicy::default(),
            optin: false,
            submit_wait_ms: default_submit_wait_ms(),
            scope: None,
            driver_script: None,
        }
    }
}

impl RunSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn submit_wait(&self) -> Duration {
        Duration::from_millis(self.submit_wait_ms)
    }
}

// Serde default helpers
fn default_concurrency() -> usize { 3 }
fn default_timeout_secs() -> u64 { 12 }
fn default_submit_wait_ms() -> u64 { 2500 }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("form-filler.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            eprintln!("Warning: ignoring malformed config '{}': {}", config_path, e);
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Install the global tracing subscriber. `FORM_FILLER_LOG` overrides the
/// level picked from `-v` flags.
pub fn init_logging(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => "form_filler=info",
        1 => "form_filler=debug",
        2 => "form_filler=trace",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("FORM_FILLER_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    // A subscriber may already be installed (tests); keep the existing one.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
}

// ============================================================================
// Application context
// ============================================================================

/// Process-wide read-only state, created once at startup and shared by
/// every task.
#[derive(Debug)]
pub struct AppContext {
    pub lexicon: Lexicon,
    pub scoring: ScoringConfig,
    pub settings: RunSettings,
    pub captcha: CaptchaHandler,
    pub events: EventLog,
}

impl AppContext {
    /// Build from config, loading the lexicon it names (or the built-in one).
    pub fn from_config(config: &AppConfig, events: EventLog) -> Result<Self, FillerError> {
        let lexicon = match config.lexicon_path.as_deref() {
            Some(path) => Lexicon::from_path(Path::new(path))?,
            None => Lexicon::builtin()?,
        };
        Ok(Self::with_lexicon(lexicon, config, events))
    }

    pub fn with_lexicon(lexicon: Lexicon, config: &AppConfig, events: EventLog) -> Self {
        let captcha = CaptchaHandler::for_provider(config.run.captcha, config.run.captcha_retry);
        AppContext {
            lexicon,
            scoring: config.scoring.clone(),
            settings: config.run.clone(),
            captcha,
            events,
        }
    }

    pub fn with_captcha(mut self, captcha: CaptchaHandler) -> Self {
        self.captcha = captcha;
        self
    }
}
