pub mod log;
pub mod severity;
pub mod time;

pub use log::{init, log, min_severity};
pub use severity::LogSeverity;
