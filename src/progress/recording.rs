//! In-memory progress observer

use super::{LogEntry, LogKind, ProgressObserver};
use crate::orchestrator::RunStatus;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Recorded {
    entries: Vec<LogEntry>,
    progress: Vec<u8>,
    statuses: Vec<RunStatus>,
    clears: usize,
}

/// Observer that keeps every notification in memory.
///
/// The log is unbounded; [`ProgressObserver::on_log_cleared`] drops stored
/// entries but the progress and status histories are kept.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    inner: Mutex<Recorded>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().entries.clone()
    }

    pub fn entries_of(&self, kind: LogKind) -> Vec<LogEntry> {
        self.lock()
            .entries
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub fn count(&self, kind: LogKind) -> usize {
        self.lock().entries.iter().filter(|e| e.kind == kind).count()
    }

    pub fn texts(&self) -> Vec<String> {
        self.lock().entries.iter().map(|e| e.text.clone()).collect()
    }

    pub fn progress_history(&self) -> Vec<u8> {
        self.lock().progress.clone()
    }

    pub fn status_history(&self) -> Vec<RunStatus> {
        self.lock().statuses.clone()
    }

    pub fn clear_count(&self) -> usize {
        self.lock().clears
    }

    /// The log rendered the way a text view would show it
    pub fn render(&self) -> String {
        self.lock()
            .entries
            .iter()
            .map(|e| format!("{}\n", e))
            .collect()
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_log_line(&self, entry: &LogEntry) {
        self.lock().entries.push(entry.clone());
    }

    fn on_progress(&self, percent: u8) {
        self.lock().progress.push(percent);
    }

    fn on_status_changed(&self, status: RunStatus) {
        self.lock().statuses.push(status);
    }

    fn on_log_cleared(&self) {
        let mut recorded = self.lock();
        recorded.entries.clear();
        recorded.clears += 1;
    }
}
