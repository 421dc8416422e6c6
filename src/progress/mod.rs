//! Progress reporting for build runs

mod handler;
mod logging;
mod recording;

pub use handler::{FanoutObserver, LogEntry, LogKind, NoOpObserver, ProgressObserver};
pub use logging::LoggingObserver;
pub use recording::RecordingObserver;
