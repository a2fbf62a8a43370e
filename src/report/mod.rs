pub mod console;

pub use console::format_run_summary;
