mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::watch;

use form_filler::browser::driver::DriverFactory;
use form_filler::browser::session::NodeDriverFactory;
use form_filler::captcha::{CaptchaHandler, CaptchaKind, CaptchaProvider, CaptchaSolver, RetryPolicy};
use form_filler::cli::config::{AppConfig, AppContext};
use form_filler::error::FillerError;
use form_filler::matching::applicant::ApplicantData;
use form_filler::runner::{FillReport, FormResult, FormStatus, FormTask, fill_form, run_pool, run_task};
use form_filler::trace::EventLog;

use crate::common::builders::{Field, context, context_with, form, lexicon};
use crate::common::mock_driver::{MockDriver, MockFactory};

fn applicant() -> Arc<ApplicantData> {
    Arc::new(ApplicantData::from_pairs([
        ("name", "山田 太郎"),
        ("email", "taro@example.com"),
        ("message", "資料を送ってください"),
    ]))
}

fn task(index: usize) -> FormTask {
    FormTask::new(format!("https://site{}.example/contact", index), applicant(), index)
}

/// A plain contact page whose submit leads to a thank-you message.
fn contact_page() -> MockDriver {
    let mut driver = MockDriver::with_fields(form(vec![
        Field::text("your-name").label("お名前"),
        Field::input("email", "your-email").label("メールアドレス"),
        Field::textarea("your-message").label("お問い合わせ内容"),
        Field::checkbox("privacy", "プライバシーポリシーに同意する"),
    ]));
    driver.submit_selector = Some("#send".into());
    driver.text_after_submit = "送信が完了しました。ありがとうございました。".into();
    driver
}

struct FixedSolver(&'static str);

#[async_trait]
impl CaptchaSolver for FixedSolver {
    async fn solve_recaptcha_v2(&self, _site_key: &str, _page_url: &str) -> Result<Option<String>, FillerError> {
        Ok(Some(self.0.to_string()))
    }

    async fn solve_hcaptcha(&self, _site_key: &str, _page_url: &str) -> Result<Option<String>, FillerError> {
        Ok(Some(self.0.to_string()))
    }
}

/// Fails the first `failures` calls, then returns a token.
struct FlakySolver {
    failures: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl CaptchaSolver for FlakySolver {
    async fn solve_recaptcha_v2(&self, _site_key: &str, _page_url: &str) -> Result<Option<String>, FillerError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            Err(FillerError::SessionIO("solver unavailable".into()))
        } else {
            Ok(Some("token-after-retry".into()))
        }
    }

    async fn solve_hcaptcha(&self, site_key: &str, page_url: &str) -> Result<Option<String>, FillerError> {
        self.solve_recaptcha_v2(site_key, page_url).await
    }
}

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        timeout_secs: 5.0,
        max_retries,
        initial_delay_ms: 1,
        backoff: 1.5,
    }
}

// ============================================================================
// Single form
// ============================================================================

#[tokio::test]
async fn successful_submission_is_ok() {
    let ctx = context();
    let mut driver = contact_page();
    let result = fill_form(&ctx, &mut driver, &task(0)).await;

    assert_eq!(result.status, FormStatus::Ok, "{}", result.note);
    assert_eq!(result.note, "filled=3 selects=0 radios=0 consent=yes");
    assert!(result.unmapped_fields.is_empty());
    assert_eq!(driver.filled.get(r#"input[name="your-name"]"#).map(String::as_str), Some("山田 太郎"));
    assert_eq!(
        driver.filled.get(r#"input[name="your-email"]"#).map(String::as_str),
        Some("taro@example.com")
    );
    assert!(driver.checked.contains(r#"input[name="privacy"]"#));
    assert_eq!(driver.clicked, vec!["#send".to_string()]);
}

#[tokio::test]
async fn dry_run_never_submits() {
    let ctx = context_with(|cfg| cfg.run.dry_run = true);
    let mut driver = contact_page();
    let result = fill_form(&ctx, &mut driver, &task(0)).await;

    assert_eq!(result.status, FormStatus::DryRun);
    assert!(result.note.starts_with("filled=3"), "{}", result.note);
    assert!(driver.clicked.is_empty());
    assert!(driver.checked.contains(r#"input[name="privacy"]"#));
}

#[tokio::test]
async fn missing_submit_button_is_a_submit_failure() {
    let ctx = context();
    let mut driver = contact_page();
    driver.submit_selector = None;
    let result = fill_form(&ctx, &mut driver, &task(0)).await;

    assert_eq!(result.status, FormStatus::SubmitFail);
    assert!(result.note.starts_with("no submit button"), "{}", result.note);
}

#[tokio::test]
async fn no_success_text_is_a_submit_failure() {
    let ctx = context();
    let mut driver = contact_page();
    driver.text_after_submit = "入力内容に誤りがあります".into();
    let result = fill_form(&ctx, &mut driver, &task(0)).await;

    assert_eq!(result.status, FormStatus::SubmitFail);
    assert!(result.note.starts_with("no success message"), "{}", result.note);
}

#[tokio::test]
async fn unsolved_captcha_blocks_submission() {
    let ctx = context();
    let mut driver = contact_page();
    driver.captcha = json!([{ "kind": "recaptcha_v2", "siteKey": "site-key" }]);
    let result = fill_form(&ctx, &mut driver, &task(0)).await;

    assert_eq!(result.status, FormStatus::CaptchaFail);
    assert_eq!(result.note, "recaptcha_v2 present, no token obtained");
    assert!(driver.clicked.is_empty());
}

#[tokio::test]
async fn solved_captcha_token_is_injected_before_submit() {
    let handler = CaptchaHandler::with_solver(CaptchaProvider::TwoCaptcha, Arc::new(FixedSolver("tok-1")), fast_retry(1));
    let ctx = context().with_captcha(handler);
    let mut driver = contact_page();
    driver.captcha = json!([{ "kind": "hcaptcha", "siteKey": "site-key" }]);
    let result = fill_form(&ctx, &mut driver, &task(0)).await;

    assert_eq!(result.status, FormStatus::Ok, "{}", result.note);
    assert_eq!(driver.injected.as_deref(), Some("tok-1"));
}

#[tokio::test]
async fn navigation_timeout_is_reported_as_timeout() {
    let ctx = context();
    let mut driver = contact_page();
    driver.navigate_timeout = true;
    let result = fill_form(&ctx, &mut driver, &task(0)).await;

    assert_eq!(result.status, FormStatus::Timeout);
    assert!(result.note.contains("navigate"), "{}", result.note);
}

#[tokio::test]
async fn page_without_fields_is_an_error() {
    let ctx = context();
    let mut driver = MockDriver::default();
    let result = fill_form(&ctx, &mut driver, &task(0)).await;

    assert_eq!(result.status, FormStatus::Error);
    assert_eq!(result.note, "no fillable fields found");
}

#[tokio::test]
async fn unmapped_keys_reach_the_result() {
    let ctx = context();
    let mut driver = contact_page();
    let data = Arc::new(ApplicantData::from_pairs([
        ("name", "山田 太郎"),
        ("email", "taro@example.com"),
        ("company", "Example株式会社"),
        ("phone", "03-1234-5678"),
    ]));
    let result = fill_form(&ctx, &mut driver, &FormTask::new("https://a.example/", data, 0)).await;
    assert_eq!(result.unmapped_fields, vec!["phone".to_string(), "company".to_string()]);
}

#[test]
fn fill_report_note_lists_what_happened() {
    let report = FillReport {
        filled: 2,
        unfilled: vec!["phone".into()],
        selects: 1,
        radios: 0,
        consent: true,
        optin: true,
    };
    assert_eq!(report.note(), "filled=2 selects=1 radios=0 consent=yes optin=yes unfilled=phone");
    assert_eq!(FillReport::default().note(), "filled=0 selects=0 radios=0 consent=no");
}

// ============================================================================
// Captcha retry
// ============================================================================

#[tokio::test]
async fn captcha_solver_is_retried_until_it_answers() {
    let solver = Arc::new(FlakySolver {
        failures: 2,
        calls: AtomicUsize::new(0),
    });
    let handler = CaptchaHandler::with_solver(CaptchaProvider::Capsolver, solver.clone(), fast_retry(3));
    let token = handler.solve(CaptchaKind::RecaptchaV2, "k", "https://a.example/").await;
    assert_eq!(token.as_deref(), Some("token-after-retry"));
    assert_eq!(solver.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn captcha_retry_budget_is_bounded() {
    let solver = Arc::new(FlakySolver {
        failures: 10,
        calls: AtomicUsize::new(0),
    });
    let handler = CaptchaHandler::with_solver(CaptchaProvider::Capsolver, solver.clone(), fast_retry(2));
    assert_eq!(handler.solve(CaptchaKind::Hcaptcha, "k", "https://a.example/").await, None);
    assert_eq!(solver.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn retry_delay_grows_by_the_backoff_factor() {
    let policy = RetryPolicy {
        initial_delay_ms: 1000,
        backoff: 2.0,
        ..RetryPolicy::default()
    };
    assert_eq!(policy.delay_before(1), Duration::from_millis(1000));
    assert_eq!(policy.delay_before(3), Duration::from_millis(4000));
}

#[tokio::test]
async fn unusable_solve_timeouts_fall_back_to_the_default() {
    let with_timeout = |timeout_secs| RetryPolicy {
        timeout_secs,
        ..RetryPolicy::default()
    };
    assert_eq!(with_timeout(2.5).solve_timeout(), Duration::from_millis(2500));
    for bad in [f64::INFINITY, f64::NAN, -1.0] {
        assert_eq!(with_timeout(bad).solve_timeout(), Duration::from_secs(120));
    }

    let policy: RetryPolicy = serde_yaml::from_str("timeout_secs: .inf\nmax_retries: 1\n").unwrap();
    let handler = CaptchaHandler::with_solver(CaptchaProvider::TwoCaptcha, Arc::new(FixedSolver("tok-1")), policy);
    let token = handler.solve(CaptchaKind::Hcaptcha, "k", "https://a.example/").await;
    assert_eq!(token.as_deref(), Some("tok-1"));
}

// ============================================================================
// Pool
// ============================================================================

fn pool_context(concurrency: usize) -> Arc<AppContext> {
    let mut config = AppConfig::default();
    config.run.concurrency = concurrency;
    Arc::new(AppContext::with_lexicon(lexicon(), &config, EventLog::disabled()))
}

#[tokio::test]
async fn pool_returns_one_result_per_task_in_order() {
    let factory = MockFactory::new(contact_page());
    let shared: Arc<dyn DriverFactory> = Arc::new(factory.clone());
    let (_tx, rx) = watch::channel(false);
    let tasks: Vec<FormTask> = (0..5).map(task).collect();

    let mut sink: Vec<FormResult> = Vec::new();
    let results = run_pool(tasks, pool_context(2), shared, rx, &mut sink).await;

    assert_eq!(results.len(), 5);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.index, i);
        assert_eq!(result.form_url, format!("https://site{}.example/contact", i));
        assert_eq!(result.status, FormStatus::Ok, "{}", result.note);
    }
    assert_eq!(sink.len(), 5);
    assert_eq!(factory.opened(), 5);
}

#[tokio::test]
async fn pool_respects_the_concurrency_limit() {
    let mut factory = MockFactory::new(contact_page());
    factory.delay = Duration::from_millis(30);
    let shared: Arc<dyn DriverFactory> = Arc::new(factory.clone());
    let (_tx, rx) = watch::channel(false);
    let tasks: Vec<FormTask> = (0..6).map(task).collect();

    let mut sink: Vec<FormResult> = Vec::new();
    let results = run_pool(tasks, pool_context(2), shared, rx, &mut sink).await;

    assert_eq!(results.len(), 6);
    assert!(factory.peak() <= 2, "peak was {}", factory.peak());
    assert!(factory.peak() >= 1);
}

#[tokio::test]
async fn cancelled_run_records_every_task() {
    let factory = MockFactory::new(contact_page());
    let shared: Arc<dyn DriverFactory> = Arc::new(factory.clone());
    let (_tx, rx) = watch::channel(true);
    let tasks: Vec<FormTask> = (0..3).map(task).collect();

    let mut sink: Vec<FormResult> = Vec::new();
    let results = run_pool(tasks, pool_context(2), shared, rx, &mut sink).await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.status == FormStatus::Error && r.note == "cancelled"));
    assert_eq!(factory.opened(), 0);
}

#[tokio::test]
async fn unopenable_context_is_an_error_result() {
    let mut factory = MockFactory::new(contact_page());
    factory.fail_open = true;
    let ctx = context();
    let result = run_task(&ctx, &factory, &task(0)).await;
    assert_eq!(result.status, FormStatus::Error);
    assert!(result.note.contains("driver process exited"), "{}", result.note);
}

#[tokio::test]
async fn unresponsive_driver_still_yields_a_timeout_result() {
    let node = std::process::Command::new("node").arg("--version").output();
    if !node.map(|o| o.status.success()).unwrap_or(false) {
        eprintln!("node not on PATH; skipping");
        return;
    }
    let script = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/silent_driver.js");
    let factory = NodeDriverFactory::new(script, true, Duration::from_millis(200));
    let ctx = context_with(|cfg| cfg.run.timeout_secs = 1);

    let result = tokio::time::timeout(Duration::from_secs(20), run_task(&ctx, &factory, &task(0)))
        .await
        .expect("run_task returned");
    assert_eq!(result.status, FormStatus::Timeout, "{}", result.note);
}

#[test]
fn results_render_as_csv_rows() {
    let result = FormResult::new(&task(4), FormStatus::SubmitFail, "no submit button", vec!["phone".into(), "company".into()]);
    let row = result.to_csv_row();
    assert_eq!(row[0], "https://site4.example/contact");
    assert_eq!(row[1], "SUBMIT_FAIL");
    assert_eq!(row[4], "phone;company");
    assert_eq!(FormResult::cancelled(&task(1)).note, "cancelled");
}

// ============================================================================
// Event stream
// ============================================================================

#[tokio::test]
async fn event_stream_records_the_task_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let ctx = AppContext::with_lexicon(lexicon(), &AppConfig::default(), EventLog::new(&path));
    let mut driver = contact_page();
    fill_form(&ctx, &mut driver, &task(7)).await;

    let content = std::fs::read_to_string(&path).unwrap();
    let events: Vec<Value> = content.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    let kinds: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
    assert_eq!(kinds.first(), Some(&"task_started"));
    assert_eq!(kinds.last(), Some(&"task_finished"));
    assert!(kinds.contains(&"fields_mapped"));

    let mapped = events.iter().find(|e| e["event"] == "fields_mapped").unwrap();
    assert_eq!(mapped["index"], 7);
    assert_eq!(mapped["mapped"]["email"], r#"input[name="your-email"]"#);
    assert!(events.iter().all(|e| e["timestamp_ms"].as_i64().is_some()));
    assert_eq!(events.last().unwrap()["status"], "OK");
}
