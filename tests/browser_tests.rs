mod common;

use std::time::Duration;

use serde_json::json;

use form_filler::browser::actions;
use form_filler::browser::driver::{BrowserDriver, OptionChoice};
use form_filler::browser::session::{NodeSession, SessionRequest, SessionResponse};
use form_filler::error::FillerError;

use crate::common::builders::Field;
use crate::common::mock_driver::MockDriver;

// =========================================================================
// Wire protocol
// =========================================================================

#[test]
fn navigate_request_serializes_with_cmd_tag() {
    let req = SessionRequest::Navigate {
        url: "https://a.example/contact",
        timeout_ms: 30000,
    };
    let value = serde_json::to_value(&req).unwrap();
    assert_eq!(
        value,
        json!({ "cmd": "navigate", "url": "https://a.example/contact", "timeout_ms": 30000 })
    );
}

#[test]
fn unit_requests_carry_only_the_tag() {
    assert_eq!(serde_json::to_value(&SessionRequest::PageText).unwrap(), json!({ "cmd": "page_text" }));
    assert_eq!(serde_json::to_value(&SessionRequest::Quit).unwrap(), json!({ "cmd": "quit" }));
}

#[test]
fn select_request_embeds_the_option_choice() {
    let choice = OptionChoice::Label("東京都".into());
    let req = SessionRequest::SelectOption {
        frame: 1,
        selector: "select[name=\"pref\"]",
        choice: &choice,
    };
    let value = serde_json::to_value(&req).unwrap();
    assert_eq!(value["cmd"], "select_option");
    assert_eq!(value["frame"], 1);
    assert_eq!(value["choice"], json!({ "by": "label", "value": "東京都" }));
    assert_eq!(
        serde_json::to_value(OptionChoice::Index(2)).unwrap(),
        json!({ "by": "index", "value": 2 })
    );
}

#[test]
fn evaluate_request_passes_the_argument_through() {
    let req = SessionRequest::Evaluate {
        frame: 0,
        script: "(arg) => arg.selector",
        arg: json!({ "selector": "#a" }),
    };
    let value = serde_json::to_value(&req).unwrap();
    assert_eq!(value["cmd"], "evaluate");
    assert_eq!(value["arg"]["selector"], "#a");
}

#[test]
fn responses_tolerate_missing_fields() {
    let ready: SessionResponse = serde_json::from_str(r#"{"ok":true,"ready":true}"#).unwrap();
    assert!(ready.ok);
    assert_eq!(ready.ready, Some(true));
    assert!(ready.frames.is_none());

    let frames: SessionResponse =
        serde_json::from_str(r#"{"ok":true,"frames":[{"index":0,"url":"https://a.example/"}]}"#).unwrap();
    assert_eq!(frames.frames.unwrap()[0].url, "https://a.example/");

    let failed: SessionResponse = serde_json::from_str(r#"{"ok":false,"error":"element not found"}"#).unwrap();
    assert!(!failed.ok);
    assert_eq!(failed.error.as_deref(), Some("element not found"));
}

#[tokio::test]
async fn launching_a_missing_driver_script_fails() {
    let result = NodeSession::launch(
        std::path::Path::new("/nonexistent/driver_server.js"),
        true,
        Duration::from_secs(2),
    )
    .await;
    assert!(result.is_err());
}

fn node_available() -> bool {
    std::process::Command::new("node")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[tokio::test]
async fn unanswered_command_abandons_the_session_and_close_returns() {
    if !node_available() {
        eprintln!("node not on PATH; skipping");
        return;
    }
    let script = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/silent_driver.js");

    let outcome = tokio::time::timeout(Duration::from_secs(20), async {
        let mut session = NodeSession::launch(&script, true, Duration::from_millis(200)).await.unwrap();

        let err = session.evaluate(0, "() => 1", json!(null)).await.unwrap_err();
        assert!(err.is_timeout(), "{:?}", err);
        assert!(session.is_poisoned());

        // Later commands fail at once instead of reading a stale reply.
        let started = std::time::Instant::now();
        let err = session.page_text().await.unwrap_err();
        assert!(matches!(err, FillerError::Timeout { .. }), "{:?}", err);
        assert!(started.elapsed() < Duration::from_secs(1));

        session.close().await.unwrap();
    })
    .await;
    assert!(outcome.is_ok(), "session never finished closing");
}

// =========================================================================
// Fallback chains
// =========================================================================

#[tokio::test]
async fn fill_uses_the_native_action_first() {
    let mut driver = MockDriver::default();
    assert!(actions::fill_value(&mut driver, 0, "#name", "山田").await);
    assert_eq!(driver.filled.get("#name").map(String::as_str), Some("山田"));
    assert_eq!(driver.calls, vec!["fill:#name".to_string()]);
}

#[tokio::test]
async fn fill_falls_back_to_setting_the_value() {
    let mut driver = MockDriver {
        fail_native_fill: true,
        ..Default::default()
    };
    assert!(actions::fill_value(&mut driver, 0, "#name", "山田").await);
    assert_eq!(driver.filled.get("#name").map(String::as_str), Some("山田"));
    assert!(driver.calls.contains(&"script:set_value".to_string()));

    driver.scripts_work = false;
    driver.filled.clear();
    assert!(!actions::fill_value(&mut driver, 0, "#name", "山田").await);
    assert!(driver.filled.is_empty());
}

#[tokio::test]
async fn select_resolves_the_value_for_a_label() {
    let select = Field::select("pref", &[("東京都", "13"), ("大阪府", "27")]).build();
    let mut driver = MockDriver::with_fields(vec![select]);
    driver.fail_native_select = true;

    let ok = actions::select_option(&mut driver, 0, r#"select[name="pref"]"#, "大阪府", "").await;
    assert!(ok);
    let tried: Vec<&str> = driver
        .calls
        .iter()
        .map(String::as_str)
        .filter(|c| c.starts_with("select:") || c.starts_with("script:"))
        .collect();
    assert_eq!(
        tried,
        vec![
            r#"select:Label("大阪府")"#,
            "script:option_value",
            r#"select:Value("27")"#,
            "script:select_by_label",
        ]
    );
}

#[tokio::test]
async fn check_walks_label_click_then_mutation() {
    let mut driver = MockDriver {
        fail_native_check: true,
        label_click_works: true,
        ..Default::default()
    };
    assert!(actions::check(&mut driver, 0, "#agree").await);
    assert!(driver.checked.contains("#agree"));
    assert!(!driver.calls.contains(&"script:set_checked".to_string()));

    let mut driver = MockDriver {
        fail_native_check: true,
        ..Default::default()
    };
    assert!(actions::check(&mut driver, 0, "#agree").await);
    assert!(driver.calls.contains(&"script:set_checked".to_string()));
    assert!(actions::is_checked(&mut driver, 0, "#agree").await);
}

#[tokio::test]
async fn stuck_checkboxes_report_failure() {
    let mut driver = MockDriver::default();
    driver.stuck.insert("#agree".into());
    assert!(!actions::check(&mut driver, 0, "#agree").await);
    assert!(!actions::is_checked(&mut driver, 0, "#agree").await);
}

#[tokio::test]
async fn click_falls_back_to_a_script_click() {
    let mut driver = MockDriver {
        fail_native_click: true,
        ..Default::default()
    };
    assert!(actions::click(&mut driver, 0, "#send").await);
    assert_eq!(driver.clicked, vec!["#send".to_string()]);
    assert!(driver.calls.contains(&"script:click".to_string()));
}
