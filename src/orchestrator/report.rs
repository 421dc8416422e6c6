use super::RunStatus;
use crate::process::{ProcessOutcome, ProcessResult};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// How a single step ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    ExitedWith(i32),
    Terminated,
    LaunchFailed(String),
    HostFault(String),
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Succeeded)
    }
}

impl From<&ProcessResult> for StepOutcome {
    fn from(result: &ProcessResult) -> Self {
        match &result.outcome {
            ProcessOutcome::Exited(0) => StepOutcome::Succeeded,
            ProcessOutcome::Exited(code) => StepOutcome::ExitedWith(*code),
            ProcessOutcome::Terminated => StepOutcome::Terminated,
            ProcessOutcome::LaunchFailed(reason) => StepOutcome::LaunchFailed(reason.clone()),
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Succeeded => write!(f, "succeeded"),
            StepOutcome::ExitedWith(code) => write!(f, "exited with code {}", code),
            StepOutcome::Terminated => write!(f, "terminated without exit code"),
            StepOutcome::LaunchFailed(reason) => write!(f, "launch failed: {}", reason),
            StepOutcome::HostFault(reason) => write!(f, "host fault: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub name: String,
    pub command: String,
    pub outcome: StepOutcome,
    pub duration_ms: u64,
}

/// Summary of one finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub steps: Vec<StepReport>,
    pub duration_ms: u64,
    /// Reason the run was aborted, for [`RunStatus::Failed`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl RunReport {
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| !s.outcome.is_success()).count()
    }

    /// Completed with every step exiting 0
    pub fn is_clean(&self) -> bool {
        self.status == RunStatus::Completed && self.failed_steps() == 0
    }
}

/// What a start request turned into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run was accepted and has finished, successfully or not
    Finished(RunReport),
    /// Another run was active; nothing was executed
    AlreadyRunning,
}

impl RunOutcome {
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Finished(report) => Some(report),
            RunOutcome::AlreadyRunning => None,
        }
    }

    pub fn into_report(self) -> Option<RunReport> {
        match self {
            RunOutcome::Finished(report) => Some(report),
            RunOutcome::AlreadyRunning => None,
        }
    }
}
