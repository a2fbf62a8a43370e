use std::fmt;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::browser::driver::BrowserDriver;
use crate::browser::scripts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptchaKind {
    RecaptchaV2,
    Hcaptcha,
}

impl fmt::Display for CaptchaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CaptchaKind::RecaptchaV2 => "recaptcha_v2",
            CaptchaKind::Hcaptcha => "hcaptcha",
        })
    }
}

/// A widget carrying a `data-sitekey`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptchaWidget {
    pub kind: CaptchaKind,
    pub site_key: String,
}

/// Widgets in the main document of the live page.
pub async fn detect_captcha(driver: &mut dyn BrowserDriver) -> Vec<CaptchaWidget> {
    match driver.evaluate(0, scripts::DETECT_CAPTCHA, Value::Null).await {
        Ok(raw) => serde_json::from_value(raw).unwrap_or_default(),
        Err(e) => {
            debug!(error = %e, "captcha detection failed");
            Vec::new()
        }
    }
}

/// Widgets in a static document. Invisible reCAPTCHA is ignored.
pub fn detect_captcha_in_html(html: &str) -> Vec<CaptchaWidget> {
    let doc = Html::parse_document(html);
    let Ok(sel) = Selector::parse("[data-sitekey]") else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for el in doc.select(&sel) {
        let v = el.value();
        let Some(site_key) = v.attr("data-sitekey").filter(|k| !k.trim().is_empty()) else {
            continue;
        };
        let class = v.attr("class").unwrap_or_default();
        let kind = if class.contains("h-captcha") {
            CaptchaKind::Hcaptcha
        } else {
            if v.attr("data-size") == Some("invisible") {
                continue;
            }
            CaptchaKind::RecaptchaV2
        };
        out.push(CaptchaWidget {
            kind,
            site_key: site_key.trim().to_string(),
        });
    }
    out
}

/// Write a solved token into the widget's response textarea.
pub async fn inject_token(driver: &mut dyn BrowserDriver, kind: CaptchaKind, token: &str) -> bool {
    match driver
        .evaluate(0, scripts::INJECT_CAPTCHA_TOKEN, json!({ "kind": kind, "token": token }))
        .await
    {
        Ok(v) => v.as_bool().unwrap_or(false),
        Err(e) => {
            debug!(error = %e, "captcha token injection failed");
            false
        }
    }
}
