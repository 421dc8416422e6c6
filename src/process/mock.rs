use super::{
    LineSender, OutputLine, ProcessOutcome, ProcessResult, ProcessRunner, RunnerError, Stream,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Scripted process runner for tests; plays back queued processes in order
pub struct MockRunner {
    processes: Mutex<VecDeque<MockProcess>>,
    calls: Mutex<Vec<MockCall>>,
}

/// A command the mock was asked to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub command: String,
    pub working_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct MockProcess {
    pub lines: Vec<OutputLine>,
    pub outcome: ProcessOutcome,
    pub fault: Option<String>,
    pub gate: Option<Arc<Notify>>,
}

impl MockProcess {
    pub fn exits(code: i32) -> Self {
        Self {
            lines: Vec::new(),
            outcome: ProcessOutcome::Exited(code),
            fault: None,
            gate: None,
        }
    }

    pub fn terminated() -> Self {
        Self {
            outcome: ProcessOutcome::Terminated,
            ..Self::exits(0)
        }
    }

    pub fn launch_failure(reason: impl Into<String>) -> Self {
        Self {
            outcome: ProcessOutcome::LaunchFailed(reason.into()),
            ..Self::exits(0)
        }
    }

    /// Fails with a [`RunnerError::Reader`] after emitting its lines
    pub fn host_fault(message: impl Into<String>) -> Self {
        Self {
            fault: Some(message.into()),
            ..Self::exits(0)
        }
    }

    pub fn stdout(mut self, text: impl Into<String>) -> Self {
        self.lines.push(OutputLine::stdout(text));
        self
    }

    pub fn stderr(mut self, text: impl Into<String>) -> Self {
        self.lines.push(OutputLine::stderr(text));
        self
    }

    /// Holds the process open after its output until `gate` is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            processes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn add_process(&self, process: MockProcess) {
        lock(&self.processes).push_back(process);
    }

    pub fn add_processes(&self, processes: impl IntoIterator<Item = MockProcess>) {
        lock(&self.processes).extend(processes);
    }

    pub fn remaining_processes(&self) -> usize {
        lock(&self.processes).len()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn joined(lines: &[OutputLine], pick: impl Fn(&OutputLine) -> bool) -> String {
    lines
        .iter()
        .filter(|l| pick(l) && !l.text.trim().is_empty())
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl ProcessRunner for MockRunner {
    async fn run(
        &self,
        command: &str,
        working_dir: &Path,
        lines: LineSender,
    ) -> Result<ProcessResult, RunnerError> {
        lock(&self.calls).push(MockCall {
            command: command.to_string(),
            working_dir: working_dir.to_path_buf(),
        });

        let process = lock(&self.processes).pop_front().ok_or_else(|| {
            RunnerError::Reader("MockRunner: No more processes in queue".to_string())
        })?;

        if let ProcessOutcome::LaunchFailed(reason) = &process.outcome {
            return Ok(ProcessResult::launch_failed(reason.clone()));
        }

        for line in &process.lines {
            // A dropped receiver only means nobody is listening
            let _ = lines.send(line.clone());
        }

        if let Some(gate) = &process.gate {
            gate.notified().await;
        }

        if let Some(message) = process.fault {
            return Err(RunnerError::Reader(message));
        }

        Ok(ProcessResult {
            stdout: joined(&process.lines, |l| l.stream == Stream::Stdout),
            stderr: joined(&process.lines, |l| l.stream == Stream::Stderr),
            outcome: process.outcome,
        })
    }
}

impl std::fmt::Debug for MockRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRunner")
            .field("remaining_processes", &self.remaining_processes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_mock_runner_plays_back_lines() {
        let runner = MockRunner::new();
        runner.add_process(MockProcess::exits(2).stdout("one").stderr("bad").stdout("two"));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let result = runner.run("make", Path::new("/src"), tx).await.unwrap();

        assert_eq!(result.outcome, ProcessOutcome::Exited(2));
        assert_eq!(result.stdout, "one\ntwo");
        assert_eq!(result.stderr, "bad");

        let mut received = Vec::new();
        while let Some(line) = rx.recv().await {
            received.push(line.text);
        }
        assert_eq!(received, vec!["one", "bad", "two"]);
        assert_eq!(
            runner.calls(),
            vec![MockCall {
                command: "make".to_string(),
                working_dir: PathBuf::from("/src"),
            }]
        );
    }

    #[tokio::test]
    async fn test_mock_runner_empty_queue() {
        let runner = MockRunner::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = runner.run("true", Path::new("."), tx).await;
        assert!(matches!(result, Err(RunnerError::Reader(_))));
    }

    #[tokio::test]
    async fn test_mock_runner_launch_failure() {
        let runner = MockRunner::new();
        runner.add_process(MockProcess::launch_failure("no such program"));
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = runner.run("nope", Path::new("."), tx).await.unwrap();
        assert_eq!(result.exit_code(), crate::process::NO_EXIT_CODE);
        assert_eq!(result.stderr, "no such program");
    }
}
