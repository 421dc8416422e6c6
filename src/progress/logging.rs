//! Logging-based progress observer

use super::{LogEntry, LogKind, ProgressObserver};
use crate::orchestrator::RunStatus;
use tracing::{debug, info, warn};

/// Observer that mirrors run notifications into `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl ProgressObserver for LoggingObserver {
    fn on_log_line(&self, entry: &LogEntry) {
        match entry.kind {
            LogKind::Output => {
                debug!(stream = "stdout", "{}", entry.text);
            }
            LogKind::ErrorOutput => {
                debug!(stream = "stderr", "{}", entry.text);
            }
            LogKind::Command => {
                debug!(command = %entry.text, "Executing");
            }
            kind if kind.is_problem() => {
                warn!(kind = ?kind, "{}", entry.text);
            }
            kind => {
                info!(kind = ?kind, "{}", entry.text);
            }
        }
    }

    fn on_progress(&self, percent: u8) {
        debug!(percent, "Progress");
    }

    fn on_status_changed(&self, status: RunStatus) {
        match status {
            RunStatus::Failed => warn!(status = %status, "Run status changed"),
            _ => info!(status = %status, "Run status changed"),
        }
    }

    fn on_log_cleared(&self) {
        debug!("Run log cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_all_kinds() {
        let observer = LoggingObserver;

        // Every kind must be accepted without panicking
        let kinds = [
            LogKind::RunStarted,
            LogKind::StepStarted,
            LogKind::Command,
            LogKind::Output,
            LogKind::ErrorOutput,
            LogKind::ExitCode,
            LogKind::Warning,
            LogKind::StepFailed,
            LogKind::RunCompleted,
            LogKind::RunFailed,
            LogKind::AlreadyRunning,
            LogKind::Cleared,
            LogKind::Info,
        ];
        for kind in kinds {
            observer.on_log_line(&LogEntry::new(kind, "text"));
        }

        observer.on_progress(42);
        observer.on_status_changed(RunStatus::Running);
        observer.on_status_changed(RunStatus::Failed);
        observer.on_log_cleared();
    }
}
