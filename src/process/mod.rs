//! Process execution layer
//!
//! A [`ProcessRunner`] launches one shell command line, streams its output
//! line by line through a [`LineSender`] while it runs, and returns the
//! assembled [`ProcessResult`] once the process exits.
//!
//! Launch failures are data, not errors: a command that cannot be started yields
//! `Ok` with [`ProcessOutcome::LaunchFailed`]. `Err(RunnerError)` is reserved
//! for faults of the host after the process was started.

mod mock;
mod shell;

pub use mock::{MockCall, MockProcess, MockRunner};
pub use shell::{Shell, ShellRunner};

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tokio::sync::mpsc;

/// Exit code reported by [`ProcessResult::exit_code`] when no real code exists
pub const NO_EXIT_CODE: i32 = -1;

/// Which output stream a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => write!(f, "stdout"),
            Stream::Stderr => write!(f, "stderr"),
        }
    }
}

/// A single line of process output, without its line terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: Stream,
    pub text: String,
}

impl OutputLine {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stream: Stream::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stream: Stream::Stderr,
            text: text.into(),
        }
    }
}

/// Channel half that receives output lines as they arrive
pub type LineSender = mpsc::UnboundedSender<OutputLine>;

/// How a launched (or not launched) process ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProcessOutcome {
    /// The process exited on its own with this code
    Exited(i32),
    /// The process ended without an exit code (killed by a signal)
    Terminated,
    /// The process could not be started at all
    LaunchFailed(String),
}

/// Captured result of one process launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub stdout: String,
    pub stderr: String,
    pub outcome: ProcessOutcome,
}

impl ProcessResult {
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            outcome: ProcessOutcome::Exited(code),
        }
    }

    pub fn launch_failed(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            stdout: String::new(),
            stderr: reason.clone(),
            outcome: ProcessOutcome::LaunchFailed(reason),
        }
    }

    /// True only for a normal exit with code 0
    pub fn success(&self) -> bool {
        self.outcome == ProcessOutcome::Exited(0)
    }

    /// Integer view of the outcome; [`NO_EXIT_CODE`] when the process has no code.
    ///
    /// A process that genuinely exits with -1 is indistinguishable here; match on
    /// [`ProcessResult::outcome`] when that matters.
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            ProcessOutcome::Exited(code) => code,
            ProcessOutcome::Terminated | ProcessOutcome::LaunchFailed(_) => NO_EXIT_CODE,
        }
    }
}

/// Faults of the process host after a process was launched
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed while waiting for process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Output reader failed: {0}")]
    Reader(String),

    #[error("Process timed out after {seconds} seconds")]
    TimedOut { seconds: u64 },
}

/// Executes shell command lines
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs `command` from `working_dir` and waits for it to finish.
    ///
    /// Every output line is sent to `lines` as soon as it is read. Lines from one
    /// stream keep their order; stdout and stderr lines may interleave arbitrarily.
    async fn run(
        &self,
        command: &str,
        working_dir: &Path,
        lines: LineSender,
    ) -> Result<ProcessResult, RunnerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_view() {
        assert_eq!(ProcessResult::exited(3, "", "").exit_code(), 3);
        assert_eq!(ProcessResult::launch_failed("nope").exit_code(), NO_EXIT_CODE);

        let terminated = ProcessResult {
            stdout: String::new(),
            stderr: String::new(),
            outcome: ProcessOutcome::Terminated,
        };
        assert_eq!(terminated.exit_code(), NO_EXIT_CODE);
        assert!(!terminated.success());
    }

    #[test]
    fn test_launch_failure_is_distinct_from_minus_one() {
        let genuine = ProcessResult::exited(-1, "", "");
        let failed = ProcessResult::launch_failed("missing shell");
        assert_eq!(genuine.exit_code(), failed.exit_code());
        assert_ne!(genuine.outcome, failed.outcome);
        assert_eq!(failed.stderr, "missing shell");
    }

    #[test]
    fn test_success() {
        assert!(ProcessResult::exited(0, "ok", "").success());
        assert!(!ProcessResult::exited(1, "", "bad").success());
    }
}
