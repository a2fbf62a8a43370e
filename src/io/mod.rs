pub mod results;
pub mod tasks;

pub use results::CsvResultWriter;
pub use tasks::{load_form_urls, load_tasks, parse_form_urls};
