pub mod preflight;
pub mod values;

pub use preflight::{PreflightVerdict, RejectReason, WidgetShape, preflight_check};
pub use values::{sanitize_email, sanitize_name, sanitize_phone, split_name, split_phone};
