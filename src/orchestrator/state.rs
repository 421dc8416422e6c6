use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of an orchestrator's current (or last) run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ready,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStatus::Ready => "Ready",
            RunStatus::Running => "Running",
            RunStatus::Completed => "Completed",
            RunStatus::Failed => "Failed",
        };
        write!(f, "{}", label)
    }
}

/// Snapshot of an orchestrator's run state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunState {
    pub is_running: bool,
    pub current_step: Option<String>,
    pub progress: u8,
    pub status: RunStatus,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            is_running: false,
            current_step: None,
            progress: 0,
            status: RunStatus::Ready,
        }
    }
}
