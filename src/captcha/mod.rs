pub mod detect;
pub mod solver;

pub use detect::{CaptchaKind, CaptchaWidget, detect_captcha, detect_captcha_in_html, inject_token};
pub use solver::{CaptchaHandler, CaptchaProvider, CaptchaSolver, NullSolver, RetryPolicy};
