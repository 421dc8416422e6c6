//! Observer contract and log entries

use crate::orchestrator::RunStatus;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// What a log entry reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// A run was accepted
    RunStarted,
    /// A step is about to run
    StepStarted,
    /// The command line of the step about to run
    Command,
    /// A stdout line that passed the output filter
    Output,
    /// A stderr line that passed the output filter
    ErrorOutput,
    /// Exit code of a finished step
    ExitCode,
    /// Non-fatal problem, such as a non-zero exit
    Warning,
    /// A step could not be launched or its host faulted
    StepFailed,
    /// All steps were processed
    RunCompleted,
    /// The run was aborted
    RunFailed,
    /// A start request was rejected because a run is active
    AlreadyRunning,
    /// The log was cleared
    Cleared,
    /// Anything else
    Info,
}

impl LogKind {
    /// Whether the entry describes a problem
    pub fn is_problem(self) -> bool {
        matches!(
            self,
            LogKind::Warning | LogKind::StepFailed | LogKind::RunFailed | LogKind::ErrorOutput
        )
    }
}

/// One timestamped line of the run log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub kind: LogKind,
    pub text: String,
}

impl LogEntry {
    pub fn new(kind: LogKind, text: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            kind,
            text: text.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S%.3f"), self.text)
    }
}

/// Receives run notifications from a [`crate::BuildOrchestrator`].
///
/// Callbacks are invoked from the orchestrator's run task, which may be any
/// runtime worker thread. Implementations that drive a UI must hand the data
/// over to their own thread. A panicking observer is not caught.
pub trait ProgressObserver: Send + Sync {
    fn on_log_line(&self, entry: &LogEntry);

    fn on_progress(&self, percent: u8);

    fn on_status_changed(&self, status: RunStatus);

    /// The run log was cleared; stored entries should be dropped
    fn on_log_cleared(&self) {}
}

/// Observer that ignores all notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpObserver;

impl ProgressObserver for NoOpObserver {
    fn on_log_line(&self, _entry: &LogEntry) {}

    fn on_progress(&self, _percent: u8) {}

    fn on_status_changed(&self, _status: RunStatus) {}
}

/// Forwards every notification to each inner observer in order
#[derive(Default, Clone)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn ProgressObserver>>,
}

impl FanoutObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl ProgressObserver for FanoutObserver {
    fn on_log_line(&self, entry: &LogEntry) {
        for observer in &self.observers {
            observer.on_log_line(entry);
        }
    }

    fn on_progress(&self, percent: u8) {
        for observer in &self.observers {
            observer.on_progress(percent);
        }
    }

    fn on_status_changed(&self, status: RunStatus) {
        for observer in &self.observers {
            observer.on_status_changed(status);
        }
    }

    fn on_log_cleared(&self) {
        for observer in &self.observers {
            observer.on_log_cleared();
        }
    }
}
