use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use form_filler::browser::driver::{BrowserDriver, DriverFactory, FrameRef, OptionChoice};
use form_filler::browser::scripts;
use form_filler::error::FillerError;
use form_filler::extract::descriptor::FieldDescriptor;

/// In-memory page driven by the same script constants the crate sends to
/// a real browser. Each native action can be made to fail so the script
/// fallbacks get exercised.
#[derive(Debug, Clone)]
pub struct MockDriver {
    pub fields: Vec<FieldDescriptor>,
    /// Text returned by `page_text` once the submit button was clicked.
    pub text_after_submit: String,
    pub submit_selector: Option<String>,
    pub captcha: Value,
    /// `(query, selector)` answers for the fixed consent probe.
    pub fixed_consent: Vec<(String, String)>,

    pub navigate_timeout: bool,
    pub fail_native_fill: bool,
    pub fail_native_select: bool,
    pub fail_native_check: bool,
    pub fail_native_click: bool,
    pub label_click_works: bool,
    pub scripts_work: bool,
    /// Selectors nothing can check.
    pub stuck: BTreeSet<String>,

    pub url: String,
    pub filled: BTreeMap<String, String>,
    pub selected: BTreeMap<String, String>,
    pub checked: BTreeSet<String>,
    pub clicked: Vec<String>,
    pub injected: Option<String>,
    pub calls: Vec<String>,
    pub closed: bool,
}

impl Default for MockDriver {
    fn default() -> Self {
        MockDriver {
            fields: Vec::new(),
            text_after_submit: String::new(),
            submit_selector: None,
            captcha: json!([]),
            fixed_consent: Vec::new(),
            navigate_timeout: false,
            fail_native_fill: false,
            fail_native_select: false,
            fail_native_check: false,
            fail_native_click: false,
            label_click_works: false,
            scripts_work: true,
            stuck: BTreeSet::new(),
            url: String::new(),
            filled: BTreeMap::new(),
            selected: BTreeMap::new(),
            checked: BTreeSet::new(),
            clicked: Vec::new(),
            injected: None,
            calls: Vec::new(),
            closed: false,
        }
    }
}

fn refused(what: &str, selector: &str) -> FillerError {
    FillerError::BrowserAction(format!("{} refused on {}", what, selector))
}

fn arg_str<'a>(arg: &'a Value, key: &str) -> &'a str {
    arg.get(key).and_then(Value::as_str).unwrap_or_default()
}

impl MockDriver {
    pub fn with_fields(fields: Vec<FieldDescriptor>) -> Self {
        MockDriver {
            fields,
            ..Default::default()
        }
    }

    fn submitted(&self) -> bool {
        self.submit_selector
            .as_ref()
            .is_some_and(|s| self.clicked.contains(s))
    }

    fn option_value(&self, selector: &str, label: &str) -> Option<String> {
        self.fields
            .iter()
            .find(|d| d.selector == selector)
            .and_then(|d| d.options.iter().find(|o| o.text == label))
            .map(|o| o.value.clone())
    }

    fn run_script(&mut self, script: &str, arg: &Value) -> Value {
        if script == scripts::EXTRACT_FIELDS {
            self.calls.push("script:extract".into());
            return serde_json::to_value(&self.fields).unwrap_or(Value::Null);
        }
        if script == scripts::SET_VALUE {
            self.calls.push("script:set_value".into());
            if self.scripts_work {
                self.filled
                    .insert(arg_str(arg, "selector").into(), arg_str(arg, "value").into());
            }
            return json!(self.scripts_work);
        }
        if script == scripts::OPTION_VALUE_FOR_LABEL {
            self.calls.push("script:option_value".into());
            return match self.option_value(arg_str(arg, "selector"), arg_str(arg, "label")) {
                Some(v) => json!(v),
                None => Value::Null,
            };
        }
        if script == scripts::SELECT_BY_LABEL {
            self.calls.push("script:select_by_label".into());
            if self.scripts_work {
                self.selected
                    .insert(arg_str(arg, "selector").into(), arg_str(arg, "label").into());
            }
            return json!(self.scripts_work);
        }
        if script == scripts::CLICK_LABEL {
            self.calls.push("script:click_label".into());
            let selector = arg_str(arg, "selector").to_string();
            if self.label_click_works && !self.stuck.contains(&selector) {
                self.checked.insert(selector);
                return json!(true);
            }
            return json!(false);
        }
        if script == scripts::SET_CHECKED {
            self.calls.push("script:set_checked".into());
            let selector = arg_str(arg, "selector").to_string();
            if self.scripts_work && !self.stuck.contains(&selector) {
                self.checked.insert(selector);
                return json!(true);
            }
            return json!(false);
        }
        if script == scripts::IS_CHECKED {
            return json!(self.checked.contains(arg_str(arg, "selector")));
        }
        if script == scripts::MARK_FIRST {
            let query = arg_str(arg, "query");
            return match self.fixed_consent.iter().find(|(q, _)| q == query) {
                Some((_, selector)) => json!({ "selector": selector, "checked": self.checked.contains(selector) }),
                None => Value::Null,
            };
        }
        if script == scripts::FIND_SUBMIT {
            return match &self.submit_selector {
                Some(s) => json!(s),
                None => Value::Null,
            };
        }
        if script == scripts::DETECT_CAPTCHA {
            return self.captcha.clone();
        }
        if script == scripts::INJECT_CAPTCHA_TOKEN {
            self.injected = Some(arg_str(arg, "token").to_string());
            return json!(true);
        }
        // Inline click fallback.
        self.calls.push("script:click".into());
        if self.scripts_work {
            self.clicked.push(arg_str(arg, "selector").to_string());
        }
        json!(self.scripts_work)
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), FillerError> {
        self.calls.push(format!("navigate:{}", url));
        if self.navigate_timeout {
            return Err(FillerError::timeout("navigate", timeout));
        }
        self.url = url.to_string();
        Ok(())
    }

    async fn frames(&mut self) -> Result<Vec<FrameRef>, FillerError> {
        Ok(vec![FrameRef {
            index: 0,
            url: self.url.clone(),
        }])
    }

    async fn evaluate(&mut self, _frame: usize, script: &str, arg: Value) -> Result<Value, FillerError> {
        Ok(self.run_script(script, &arg))
    }

    async fn fill(&mut self, _frame: usize, selector: &str, value: &str) -> Result<(), FillerError> {
        self.calls.push(format!("fill:{}", selector));
        if self.fail_native_fill {
            return Err(refused("fill", selector));
        }
        self.filled.insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn select_option(&mut self, _frame: usize, selector: &str, choice: &OptionChoice) -> Result<(), FillerError> {
        self.calls.push(format!("select:{:?}", choice));
        if self.fail_native_select {
            return Err(refused("select", selector));
        }
        let label = match choice {
            OptionChoice::Label(label) => label.clone(),
            OptionChoice::Value(value) => value.clone(),
            OptionChoice::Index(i) => i.to_string(),
        };
        self.selected.insert(selector.to_string(), label);
        Ok(())
    }

    async fn set_checked(&mut self, _frame: usize, selector: &str, checked: bool) -> Result<(), FillerError> {
        self.calls.push(format!("check:{}", selector));
        if self.fail_native_check || self.stuck.contains(selector) {
            return Err(refused("check", selector));
        }
        if checked {
            self.checked.insert(selector.to_string());
        } else {
            self.checked.remove(selector);
        }
        Ok(())
    }

    async fn click(&mut self, _frame: usize, selector: &str) -> Result<(), FillerError> {
        self.calls.push(format!("click:{}", selector));
        if self.fail_native_click {
            return Err(refused("click", selector));
        }
        self.clicked.push(selector.to_string());
        Ok(())
    }

    async fn wait_for_selector(&mut self, _frame: usize, _selector: &str, _timeout: Duration) -> Result<(), FillerError> {
        Ok(())
    }

    async fn page_text(&mut self) -> Result<String, FillerError> {
        if self.submitted() {
            Ok(self.text_after_submit.clone())
        } else {
            Ok(String::new())
        }
    }

    async fn current_url(&mut self) -> Result<String, FillerError> {
        Ok(self.url.clone())
    }

    async fn wait_idle(&mut self, _duration: Duration) -> Result<(), FillerError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), FillerError> {
        self.closed = true;
        Ok(())
    }
}

/// Hands out clones of one template page and counts opens/closes.
#[derive(Debug, Clone, Default)]
pub struct MockFactory {
    pub template: MockDriver,
    pub fail_open: bool,
    pub delay: Duration,
    pub opened: Arc<AtomicUsize>,
    pub in_flight: Arc<AtomicUsize>,
    pub peak: Arc<Mutex<usize>>,
}

impl MockFactory {
    pub fn new(template: MockDriver) -> Self {
        MockFactory {
            template,
            ..Default::default()
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.lock().map(|p| *p).unwrap_or(0)
    }
}

/// Driver wrapper that tracks how many contexts are open at once.
struct Tracked {
    inner: MockDriver,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserDriver for Tracked {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), FillerError> {
        tokio::time::sleep(self.delay).await;
        self.inner.navigate(url, timeout).await
    }

    async fn frames(&mut self) -> Result<Vec<FrameRef>, FillerError> {
        self.inner.frames().await
    }

    async fn evaluate(&mut self, frame: usize, script: &str, arg: Value) -> Result<Value, FillerError> {
        self.inner.evaluate(frame, script, arg).await
    }

    async fn fill(&mut self, frame: usize, selector: &str, value: &str) -> Result<(), FillerError> {
        self.inner.fill(frame, selector, value).await
    }

    async fn select_option(&mut self, frame: usize, selector: &str, choice: &OptionChoice) -> Result<(), FillerError> {
        self.inner.select_option(frame, selector, choice).await
    }

    async fn set_checked(&mut self, frame: usize, selector: &str, checked: bool) -> Result<(), FillerError> {
        self.inner.set_checked(frame, selector, checked).await
    }

    async fn click(&mut self, frame: usize, selector: &str) -> Result<(), FillerError> {
        self.inner.click(frame, selector).await
    }

    async fn wait_for_selector(&mut self, frame: usize, selector: &str, timeout: Duration) -> Result<(), FillerError> {
        self.inner.wait_for_selector(frame, selector, timeout).await
    }

    async fn page_text(&mut self) -> Result<String, FillerError> {
        self.inner.page_text().await
    }

    async fn current_url(&mut self) -> Result<String, FillerError> {
        self.inner.current_url().await
    }

    async fn wait_idle(&mut self, duration: Duration) -> Result<(), FillerError> {
        self.inner.wait_idle(duration).await
    }

    async fn close(&mut self) -> Result<(), FillerError> {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.close().await
    }
}

#[async_trait]
impl DriverFactory for MockFactory {
    async fn open(&self) -> Result<Box<dyn BrowserDriver>, FillerError> {
        if self.fail_open {
            return Err(FillerError::SessionIO("driver process exited".into()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut peak) = self.peak.lock() {
            *peak = (*peak).max(now);
        }
        Ok(Box::new(Tracked {
            inner: self.template.clone(),
            delay: self.delay,
            in_flight: self.in_flight.clone(),
        }))
    }
}
