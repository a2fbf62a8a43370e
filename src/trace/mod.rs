pub mod events;
pub mod logger;

pub use events::RunEvent;
pub use logger::EventLog;
