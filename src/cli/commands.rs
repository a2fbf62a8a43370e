use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::browser::session::{DEFAULT_DRIVER_SCRIPT, NodeDriverFactory};
use crate::captcha::{CaptchaWidget, detect_captcha_in_html};
use crate::choice::consent::{ConsentAction, consent_candidates, optin_candidates};
use crate::choice::radio::{RadioPick, plan_required_radios};
use crate::choice::select::{SelectDecision, SelectInputs, resolve_assigned_select, resolve_select};
use crate::cli::config::{AppConfig, AppContext};
use crate::error::FillerError;
use crate::extract::descriptor::FieldDescriptor;
use crate::extract::html::extract_fields_from_html;
use crate::io::{CsvResultWriter, load_tasks};
use crate::matching::applicant::ApplicantData;
use crate::matching::matcher::{MatchOutcome, match_fields};
use crate::report::console::format_run_summary;
use crate::runner::pool::run_pool;
use crate::runner::task::FormResult;
use crate::trace::EventLog;

// ============================================================================
// run subcommand
// ============================================================================

/// Paths and per-invocation switches of `form-filler run`.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub csv: PathBuf,
    pub data: PathBuf,
    pub output: PathBuf,
    pub limit: Option<usize>,
    pub emit_json: Option<PathBuf>,
    pub driver_script: Option<PathBuf>,
    pub show_browser: bool,
}

/// Fill every listed form and write the result CSV. Returns the results
/// in task order.
pub async fn cmd_run(options: &RunOptions, config: &AppConfig) -> Result<Vec<FormResult>, FillerError> {
    let tasks = load_tasks(&options.csv, &options.data, options.limit)?;
    let mut sink = CsvResultWriter::create(&options.output)?;

    let events = match &options.emit_json {
        Some(path) => EventLog::new(path),
        None => EventLog::disabled(),
    };
    let ctx = Arc::new(AppContext::from_config(config, events)?);

    let script = options
        .driver_script
        .clone()
        .or_else(|| config.run.driver_script.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DRIVER_SCRIPT));
    let headless = !options.show_browser && config.run.headless.unwrap_or(true);
    let factory = Arc::new(NodeDriverFactory::new(script, headless, config.run.timeout()));

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, no new tasks will start");
            let _ = cancel_tx.send(true);
        }
    });

    let started = Instant::now();
    let results = run_pool(tasks, ctx, factory, cancel_rx, &mut sink).await;

    print!("{}", format_run_summary(&results, Some(started.elapsed())));
    info!(output = %options.output.display(), "results written");
    Ok(results)
}

// ============================================================================
// map subcommand
// ============================================================================

/// One select the preview would change.
#[derive(Debug, Clone, Serialize)]
pub struct SelectPreview {
    pub selector: String,
    /// Logical key when the matcher assigned this select.
    pub key: Option<String>,
    pub decision: SelectDecision,
}

/// Browser-free preview of what a run would do on one document.
#[derive(Debug, Clone, Serialize)]
pub struct MapReport {
    pub fields: usize,
    pub outcome: MatchOutcome,
    pub selects: Vec<SelectPreview>,
    pub radios: Vec<RadioPick>,
    /// First consent target a run would try.
    pub consent: Option<ConsentAction>,
    pub optin: Option<ConsentAction>,
    pub captcha: Vec<CaptchaWidget>,
}

/// Extract, match and resolve choices on already extracted fields.
pub fn map_fields(fields: &[FieldDescriptor], data: &ApplicantData, ctx: &AppContext) -> MapReport {
    let lexicon = &ctx.lexicon;
    let threshold = ctx.scoring.inquiry_threshold;
    let outcome = match_fields(fields, data, lexicon, &ctx.scoring);
    let values = data.field_values();

    let mut selects = Vec::new();
    for (key, target) in outcome.assignments.iter().filter(|(_, t)| t.is_select()) {
        let decision = fields
            .iter()
            .find(|d| d.frame_index == target.frame_index && d.selector == target.selector)
            .zip(values.get(*key))
            .and_then(|(d, value)| resolve_assigned_select(d, *key, value, lexicon, threshold));
        if let Some(decision) = decision {
            selects.push(SelectPreview {
                selector: target.selector.clone(),
                key: Some(key.as_str()),
                decision,
            });
        }
    }

    let inputs = SelectInputs::from_data(data, lexicon);
    for d in fields
        .iter()
        .filter(|d| d.is_select() && d.visible && !d.disabled && d.is_locatable())
    {
        let assigned = outcome
            .assignments
            .values()
            .any(|t| t.frame_index == d.frame_index && t.selector == d.selector);
        if assigned {
            continue;
        }
        if let Some(decision) = resolve_select(d, &inputs, lexicon, threshold) {
            selects.push(SelectPreview {
                selector: d.selector.clone(),
                key: None,
                decision,
            });
        }
    }

    MapReport {
        fields: fields.len(),
        radios: plan_required_radios(fields, lexicon),
        consent: consent_candidates(fields, &[], lexicon).into_iter().next(),
        optin: if ctx.settings.optin {
            optin_candidates(fields, lexicon).into_iter().next()
        } else {
            None
        },
        captcha: Vec::new(),
        outcome,
        selects,
    }
}

/// Preview one static HTML document.
pub fn map_document(html: &str, page_url: &str, scope: Option<&str>, data: &ApplicantData, ctx: &AppContext) -> MapReport {
    let fields = extract_fields_from_html(html, page_url, scope);
    let mut report = map_fields(&fields, data, ctx);
    report.captcha = detect_captcha_in_html(html);
    report
}

async fn fetch_page(url: &str) -> Result<String, FillerError> {
    let fetch_err = |source| FillerError::Fetch {
        url: url.to_string(),
        source,
    };
    let response = reqwest::get(url).await.map_err(fetch_err)?;
    let response = response.error_for_status().map_err(fetch_err)?;
    response.text().await.map_err(fetch_err)
}

/// Print the JSON preview for a local file or a fetched page.
pub async fn cmd_map(
    html: Option<&Path>,
    url: Option<&str>,
    data_path: &Path,
    scope: Option<&str>,
    config: &AppConfig,
) -> Result<MapReport, FillerError> {
    let (content, page_url) = match (html, url) {
        (Some(path), _) => {
            let content = std::fs::read_to_string(path).map_err(|e| FillerError::Input {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            (content, format!("file://{}", path.display()))
        }
        (None, Some(url)) => (fetch_page(url).await?, url.to_string()),
        (None, None) => {
            return Err(FillerError::Input {
                path: "-".into(),
                message: "either --html or --url is required".into(),
            });
        }
    };

    let data = ApplicantData::from_path(data_path)?;
    let ctx = AppContext::from_config(config, EventLog::disabled())?;
    let scope = scope.or(config.run.scope.as_deref());
    let report = map_document(&content, &page_url, scope, &data, &ctx);

    let json = serde_json::to_string_pretty(&report).map_err(|e| FillerError::JsonSerialize {
        context: "MapReport".into(),
        source: e,
    })?;
    println!("{}", json);
    Ok(report)
}
