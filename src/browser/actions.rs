//! Fill/select/check/click with fallback chains.
//!
//! Every function tries the native driver action first and degrades to
//! script-side state mutation plus synthetic events. Failures at each
//! step are logged and swallowed; the caller only learns whether the
//! element ended up in the wanted state.

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::browser::driver::{BrowserDriver, OptionChoice};
use crate::browser::scripts;

/// Evaluate a helper script and read its result as a boolean.
async fn eval_bool(driver: &mut dyn BrowserDriver, frame: usize, script: &str, arg: Value) -> bool {
    match driver.evaluate(frame, script, arg).await {
        Ok(value) => value.as_bool().unwrap_or(false),
        Err(e) => {
            debug!(error = %e, "helper script failed");
            false
        }
    }
}

/// Type `value` into a text control.
pub async fn fill_value(driver: &mut dyn BrowserDriver, frame: usize, selector: &str, value: &str) -> bool {
    match driver.fill(frame, selector, value).await {
        Ok(()) => return true,
        Err(e) => debug!(selector, error = %e, "native fill failed, setting value by script"),
    }
    let ok = eval_bool(
        driver,
        frame,
        scripts::SET_VALUE,
        json!({ "selector": selector, "value": value }),
    )
    .await;
    if !ok {
        warn!(selector, "field left unfilled");
    }
    ok
}

/// Choose an option by visible label, then by its value, then by direct
/// mutation of the select state.
pub async fn select_option(
    driver: &mut dyn BrowserDriver,
    frame: usize,
    selector: &str,
    label: &str,
    value: &str,
) -> bool {
    let by_label = OptionChoice::Label(label.to_string());
    match driver.select_option(frame, selector, &by_label).await {
        Ok(()) => return true,
        Err(e) => debug!(selector, label, error = %e, "select by label failed"),
    }

    let resolved = match driver
        .evaluate(
            frame,
            scripts::OPTION_VALUE_FOR_LABEL,
            json!({ "selector": selector, "label": label }),
        )
        .await
    {
        Ok(Value::String(v)) if !v.is_empty() => v,
        _ => value.to_string(),
    };
    if !resolved.is_empty() {
        match driver
            .select_option(frame, selector, &OptionChoice::Value(resolved.clone()))
            .await
        {
            Ok(()) => return true,
            Err(e) => debug!(selector, value = %resolved, error = %e, "select by value failed"),
        }
    }

    let ok = eval_bool(
        driver,
        frame,
        scripts::SELECT_BY_LABEL,
        json!({ "selector": selector, "label": label, "value": resolved }),
    )
    .await;
    if !ok {
        warn!(selector, label, "select left unchanged");
    }
    ok
}

/// Whether a checkbox/radio reports itself checked.
pub async fn is_checked(driver: &mut dyn BrowserDriver, frame: usize, selector: &str) -> bool {
    eval_bool(driver, frame, scripts::IS_CHECKED, json!({ "selector": selector })).await
}

/// Check a checkbox or radio: native check, then a click on its label,
/// then direct mutation.
pub async fn check(driver: &mut dyn BrowserDriver, frame: usize, selector: &str) -> bool {
    match driver.set_checked(frame, selector, true).await {
        Ok(()) => return true,
        Err(e) => debug!(selector, error = %e, "native check failed, clicking label"),
    }
    if eval_bool(driver, frame, scripts::CLICK_LABEL, json!({ "selector": selector })).await {
        return true;
    }
    let ok = eval_bool(
        driver,
        frame,
        scripts::SET_CHECKED,
        json!({ "selector": selector, "checked": true }),
    )
    .await;
    if !ok {
        warn!(selector, "checkable left unchecked");
    }
    ok
}

/// Click an element, falling back to a script-side `click()`.
pub async fn click(driver: &mut dyn BrowserDriver, frame: usize, selector: &str) -> bool {
    match driver.click(frame, selector).await {
        Ok(()) => true,
        Err(e) => {
            debug!(selector, error = %e, "native click failed, clicking by script");
            let script = "(arg) => { const el = document.querySelector(arg.selector); if (!el) return false; el.click(); return true; }";
            eval_bool(driver, frame, script, json!({ "selector": selector })).await
        }
    }
}
