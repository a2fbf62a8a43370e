//! Page-side helpers evaluated through [`BrowserDriver::evaluate`].
//!
//! Each script is a function expression taking one JSON argument.
//!
//! [`BrowserDriver::evaluate`]: crate::browser::driver::BrowserDriver::evaluate

pub const EXTRACT_FIELDS: &str = include_str!("scripts/extract_fields.js");
pub const SET_VALUE: &str = include_str!("scripts/set_value.js");
pub const OPTION_VALUE_FOR_LABEL: &str = include_str!("scripts/option_value_for_label.js");
pub const SELECT_BY_LABEL: &str = include_str!("scripts/select_by_label.js");
pub const SET_CHECKED: &str = include_str!("scripts/set_checked.js");
pub const CLICK_LABEL: &str = include_str!("scripts/click_label.js");
pub const IS_CHECKED: &str = include_str!("scripts/is_checked.js");
pub const MARK_FIRST: &str = include_str!("scripts/mark_first.js");
pub const FIND_SUBMIT: &str = include_str!("scripts/find_submit.js");
pub const DETECT_CAPTCHA: &str = include_str!("scripts/detect_captcha.js");
pub const INJECT_CAPTCHA_TOKEN: &str = include_str!("scripts/inject_captcha_token.js");
