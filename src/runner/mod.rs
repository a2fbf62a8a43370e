pub mod filler;
pub mod pool;
pub mod success;
pub mod task;

pub use filler::{FillReport, fill_form};
pub use pool::{ResultSink, run_pool, run_task};
pub use task::{FormResult, FormStatus, FormTask};
