use std::collections::{BTreeMap, HashMap};

use serde_json::json;
use tracing::{debug, info, warn};

use crate::browser::actions;
use crate::browser::driver::BrowserDriver;
use crate::browser::scripts;
use crate::captcha::{detect_captcha, inject_token};
use crate::choice::apply::{accept_consent, apply_optin, apply_radio_picks, apply_select};
use crate::choice::consent::{consent_candidates, optin_candidates};
use crate::choice::radio::plan_required_radios;
use crate::choice::select::{SelectDecision, SelectInputs, resolve_assigned_select, resolve_select};
use crate::cli::config::AppContext;
use crate::error::FillerError;
use crate::extract::descriptor::FieldDescriptor;
use crate::extract::live;
use crate::matching::applicant::FieldValues;
use crate::matching::matcher::{MatchOutcome, match_field_values};
use crate::runner::success::looks_like_success;
use crate::runner::task::{FormResult, FormStatus, FormTask};
use crate::sanitize::values::sanitize_for_key;
use crate::trace::RunEvent;

/// What one pass over a form managed to do.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FillReport {
    pub filled: usize,
    /// Logical keys whose element could not be filled.
    pub unfilled: Vec<String>,
    pub selects: usize,
    pub radios: usize,
    pub consent: bool,
    pub optin: bool,
}

impl FillReport {
    pub fn note(&self) -> String {
        let mut note = format!(
            "filled={} selects={} radios={} consent={}",
            self.filled,
            self.selects,
            self.radios,
            if self.consent { "yes" } else { "no" }
        );
        if self.optin {
            note.push_str(" optin=yes");
        }
        if !self.unfilled.is_empty() {
            note.push_str(&format!(" unfilled={}", self.unfilled.join(",")));
        }
        note
    }
}

/// Run one task against an already opened driver and produce its result.
///
/// Never fails: every error path maps to a terminal [`FormStatus`].
pub async fn fill_form(ctx: &AppContext, driver: &mut dyn BrowserDriver, task: &FormTask) -> FormResult {
    ctx.events.log(&RunEvent::TaskStarted {
        index: task.index,
        url: task.form_url.clone(),
    });

    let mut unmapped = Vec::new();
    let result = match run_steps(ctx, driver, task, &mut unmapped).await {
        Ok((status, note)) => FormResult::new(task, status, note, unmapped),
        Err(e) => {
            let status = if e.is_timeout() {
                FormStatus::Timeout
            } else {
                FormStatus::Error
            };
            warn!(url = %task.form_url, error = %e, "form task failed");
            FormResult::new(task, status, e.to_string(), unmapped)
        }
    };

    info!(
        index = task.index,
        url = %task.form_url,
        status = %result.status,
        note = %result.note,
        "form task finished"
    );
    ctx.events.log(&RunEvent::TaskFinished {
        index: task.index,
        url: task.form_url.clone(),
        status: result.status.to_string(),
        note: result.note.clone(),
    });
    result
}

async fn run_steps(
    ctx: &AppContext,
    driver: &mut dyn BrowserDriver,
    task: &FormTask,
    unmapped: &mut Vec<String>,
) -> Result<(FormStatus, String), FillerError> {
    let settings = &ctx.settings;
    driver.navigate(&task.form_url, settings.timeout()).await?;

    let frames = live::list_frames(driver).await;
    let fields = live::extract_fields(driver, &frames, settings.scope.as_deref()).await;
    if fields.is_empty() {
        return Ok((FormStatus::Error, "no fillable fields found".into()));
    }

    let values = task.data.field_values();
    let outcome = match_field_values(&fields, &values, &ctx.lexicon, &ctx.scoring);
    *unmapped = outcome.unmapped_names();
    log_mapping(ctx, task, &outcome);

    let mut report = FillReport::default();
    fill_assignments(ctx, driver, task, &fields, &values, &outcome, &mut report).await;
    auto_select_pass(ctx, driver, task, &fields, &outcome, &mut report).await;

    let picks = plan_required_radios(&fields, &ctx.lexicon);
    report.radios = apply_radio_picks(driver, &picks).await.len();

    let fixed = live::find_fixed_consent(driver, &frames, &ctx.lexicon).await;
    let consent = consent_candidates(&fields, &fixed, &ctx.lexicon);
    report.consent = accept_consent(driver, &consent).await.is_some();
    if settings.optin {
        let optional = optin_candidates(&fields, &ctx.lexicon);
        report.optin = apply_optin(driver, &optional).await.is_some();
    }

    if settings.dry_run {
        return Ok((FormStatus::DryRun, report.note()));
    }

    if let Some(note) = handle_captcha(ctx, driver, task).await {
        return Ok((FormStatus::CaptchaFail, note));
    }

    submit(ctx, driver, &report).await
}

fn log_mapping(ctx: &AppContext, task: &FormTask, outcome: &MatchOutcome) {
    if !ctx.events.is_enabled() {
        return;
    }
    let mapped: BTreeMap<String, String> = outcome
        .assignments
        .iter()
        .map(|(key, target)| (key.as_str(), target.selector.clone()))
        .collect();
    ctx.events.log(&RunEvent::FieldsMapped {
        index: task.index,
        url: task.form_url.clone(),
        mapped,
        unmapped: outcome.unmapped_names(),
        rejected: outcome.rejections.len(),
    });
}

fn descriptor_index(fields: &[FieldDescriptor]) -> HashMap<(usize, &str), &FieldDescriptor> {
    fields
        .iter()
        .map(|d| ((d.frame_index, d.selector.as_str()), d))
        .collect()
}

async fn fill_assignments(
    ctx: &AppContext,
    driver: &mut dyn BrowserDriver,
    task: &FormTask,
    fields: &[FieldDescriptor],
    values: &FieldValues,
    outcome: &MatchOutcome,
    report: &mut FillReport,
) {
    let by_selector = descriptor_index(fields);

    for (key, target) in &outcome.assignments {
        let Some(raw) = values.get(*key) else {
            continue;
        };
        let done = if target.is_select() {
            let decision = by_selector
                .get(&(target.frame_index, target.selector.as_str()))
                .and_then(|d| resolve_assigned_select(d, *key, raw, &ctx.lexicon, ctx.scoring.inquiry_threshold));
            match decision {
                Some(decision) => {
                    let ok = apply_select(driver, target.frame_index, &target.selector, &decision).await;
                    if ok {
                        log_select(ctx, task, &target.selector, &decision);
                        report.selects += 1;
                    }
                    ok
                }
                None => {
                    debug!(key = %key, selector = %target.selector, "no option fits the assigned value");
                    false
                }
            }
        } else {
            let value = sanitize_for_key(*key, raw);
            actions::fill_value(driver, target.frame_index, &target.selector, &value).await
        };
        if done {
            report.filled += 1;
        } else {
            report.unfilled.push(key.as_str());
        }
    }
}

/// Resolve every visible select the matcher left alone.
async fn auto_select_pass(
    ctx: &AppContext,
    driver: &mut dyn BrowserDriver,
    task: &FormTask,
    fields: &[FieldDescriptor],
    outcome: &MatchOutcome,
    report: &mut FillReport,
) {
    let inputs = SelectInputs::from_data(&task.data, &ctx.lexicon);
    let assigned: Vec<(usize, &str)> = outcome
        .assignments
        .values()
        .map(|t| (t.frame_index, t.selector.as_str()))
        .collect();

    for d in fields
        .iter()
        .filter(|d| d.is_select() && d.visible && !d.disabled && d.is_locatable())
    {
        if assigned.contains(&(d.frame_index, d.selector.as_str())) {
            continue;
        }
        let Some(decision) = resolve_select(d, &inputs, &ctx.lexicon, ctx.scoring.inquiry_threshold) else {
            continue;
        };
        if apply_select(driver, d.frame_index, &d.selector, &decision).await {
            log_select(ctx, task, &d.selector, &decision);
            report.selects += 1;
        }
    }
}

fn log_select(ctx: &AppContext, task: &FormTask, selector: &str, decision: &SelectDecision) {
    ctx.events.log(&RunEvent::SelectResolved {
        index: task.index,
        selector: selector.to_string(),
        kind: decision.kind.to_string(),
        label: decision.label.clone(),
        via: format!("{:?}", decision.via),
    });
}

/// Solve and inject the first detected widget. Returns a failure note
/// when a widget is present and no token could be obtained.
async fn handle_captcha(ctx: &AppContext, driver: &mut dyn BrowserDriver, task: &FormTask) -> Option<String> {
    let widgets = detect_captcha(driver).await;
    let widget = widgets.first()?;
    let page_url = driver
        .current_url()
        .await
        .unwrap_or_else(|_| task.form_url.clone());

    let token = ctx.captcha.solve(widget.kind, &widget.site_key, &page_url).await;
    ctx.events.log(&RunEvent::CaptchaDetected {
        index: task.index,
        kind: widget.kind.to_string(),
        solved: token.is_some(),
    });
    match token {
        Some(token) => {
            if !inject_token(driver, widget.kind, &token).await {
                warn!(kind = %widget.kind, "captcha token could not be injected");
            }
            None
        }
        None => Some(format!("{} present, no token obtained", widget.kind)),
    }
}

async fn submit(
    ctx: &AppContext,
    driver: &mut dyn BrowserDriver,
    report: &FillReport,
) -> Result<(FormStatus, String), FillerError> {
    let found = driver
        .evaluate(0, scripts::FIND_SUBMIT, json!({ "mark": "submit" }))
        .await
        .ok()
        .and_then(|v| v.as_str().map(str::to_string));
    let Some(selector) = found else {
        return Ok((FormStatus::SubmitFail, format!("no submit button; {}", report.note())));
    };
    if !actions::click(driver, 0, &selector).await {
        return Ok((FormStatus::SubmitFail, format!("submit click failed; {}", report.note())));
    }

    driver.wait_idle(ctx.settings.submit_wait()).await?;
    let text = driver.page_text().await?;
    if looks_like_success(&text, &ctx.lexicon.success_phrases) {
        Ok((FormStatus::Ok, report.note()))
    } else {
        Ok((FormStatus::SubmitFail, format!("no success message; {}", report.note())))
    }
}
