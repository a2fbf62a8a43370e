pub mod actions;
pub mod driver;
pub mod scripts;
pub mod session;

pub use driver::{BrowserDriver, DriverFactory, FrameRef, OptionChoice};
pub use session::{NodeDriverFactory, NodeSession};
