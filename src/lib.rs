//! Contact-form auto-filler.
//!
//! Pipeline per form: extract field descriptors from the page, map
//! applicant data onto them, resolve select/radio/consent widgets, then
//! fill and submit through a [`browser::BrowserDriver`].

pub mod browser;
pub mod captcha;
pub mod choice;
pub mod cli;
pub mod error;
pub mod extract;
pub mod io;
pub mod lexicon;
pub mod matching;
pub mod report;
pub mod runner;
pub mod sanitize;
pub mod text;
pub mod trace;

pub use error::FillerError;
