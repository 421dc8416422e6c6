use super::report::{RunOutcome, RunReport, StepOutcome, StepReport};
use super::state::{RunState, RunStatus};
use crate::filter::OutputFilter;
use crate::process::{OutputLine, ProcessOutcome, ProcessRunner, Stream};
use crate::progress::{LogEntry, LogKind, ProgressObserver};
use crate::step::{BuildStep, StepError, MAX_PROGRESS};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

/// Pause inserted after every step so observers can follow along
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(500);

/// Faults that abort a whole run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Malformed step list: {0}")]
    MalformedStep(#[from] StepError),

    #[error("Run task aborted: {0}")]
    Aborted(String),
}

/// Settings applied to every run of an orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Directory for steps without their own working directory
    pub working_dir: PathBuf,
    /// Pause after each step
    pub step_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            step_delay: DEFAULT_STEP_DELAY,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }
}

/// Runs ordered build steps one at a time and reports what happens.
///
/// At most one run is active per orchestrator. Step failures are logged and the
/// run moves on to the next step; only a malformed step aborts the run.
pub struct BuildOrchestrator {
    runner: Arc<dyn ProcessRunner>,
    observer: Arc<dyn ProgressObserver>,
    filter: Arc<OutputFilter>,
    config: OrchestratorConfig,
    state: Arc<Mutex<RunState>>,
}

impl BuildOrchestrator {
    pub fn new(runner: Arc<dyn ProcessRunner>, observer: Arc<dyn ProgressObserver>) -> Self {
        Self {
            runner,
            observer,
            filter: Arc::new(OutputFilter::default()),
            config: OrchestratorConfig::default(),
            state: Arc::new(Mutex::new(RunState::default())),
        }
    }

    pub fn with_filter(mut self, filter: OutputFilter) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        lock_state(&self.state).clone()
    }

    pub fn is_running(&self) -> bool {
        lock_state(&self.state).is_running
    }

    /// Starts running `steps` on the tokio runtime and returns immediately.
    ///
    /// If a run is already active the request is dropped: an
    /// [`LogKind::AlreadyRunning`] entry is emitted and the returned handle
    /// resolves to [`RunOutcome::AlreadyRunning`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_run(&self, steps: Vec<BuildStep>) -> RunHandle {
        let Some(guard) = self.try_begin() else {
            info!("Build already running, ignoring request");
            self.emit(LogKind::AlreadyRunning, "Build already running, ignoring request");
            return RunHandle {
                run_id: None,
                task: None,
            };
        };

        let run_id = Uuid::new_v4();
        self.observer.on_status_changed(RunStatus::Running);
        self.observer.on_progress(0);
        self.emit(
            LogKind::RunStarted,
            format!("=== BUILD PROCESS STARTED ({} steps) ===", steps.len()),
        );

        let run = ActiveRun {
            run_id,
            runner: Arc::clone(&self.runner),
            observer: Arc::clone(&self.observer),
            filter: Arc::clone(&self.filter),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
        };
        let span = info_span!("run", run_id = %run_id);
        let task = tokio::spawn(run.execute(steps, guard).instrument(span));

        RunHandle {
            run_id: Some(run_id),
            task: Some(task),
        }
    }

    /// Starts a run and waits for it to finish
    pub async fn run_to_completion(&self, steps: Vec<BuildStep>) -> Result<RunOutcome, RunError> {
        self.start_run(steps).wait().await
    }

    /// Resets status and progress and clears the observer's log.
    ///
    /// An active run is not interrupted; it keeps reporting into the fresh log.
    pub fn clear(&self) {
        {
            let mut state = lock_state(&self.state);
            state.status = RunStatus::Ready;
            state.progress = 0;
            state.current_step = None;
        }
        self.observer.on_log_cleared();
        self.observer.on_progress(0);
        self.observer.on_status_changed(RunStatus::Ready);
        self.emit(LogKind::Cleared, "Log cleared by user");
    }

    fn try_begin(&self) -> Option<RunGuard> {
        let mut state = lock_state(&self.state);
        if state.is_running {
            return None;
        }
        *state = RunState {
            is_running: true,
            current_step: None,
            progress: 0,
            status: RunStatus::Running,
        };
        Some(RunGuard {
            state: Arc::clone(&self.state),
            released: false,
        })
    }

    fn emit(&self, kind: LogKind, text: impl Into<String>) {
        self.observer.on_log_line(&LogEntry::new(kind, text));
    }
}

/// Handle to a started (or rejected) run
#[derive(Debug)]
pub struct RunHandle {
    run_id: Option<Uuid>,
    task: Option<JoinHandle<RunReport>>,
}

impl RunHandle {
    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    pub fn was_accepted(&self) -> bool {
        self.task.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub async fn wait(self) -> Result<RunOutcome, RunError> {
        match self.task {
            None => Ok(RunOutcome::AlreadyRunning),
            Some(task) => task
                .await
                .map(RunOutcome::Finished)
                .map_err(|e| RunError::Aborted(e.to_string())),
        }
    }
}

/// Clears the running flag when a run ends, including by panic
struct RunGuard {
    state: Arc<Mutex<RunState>>,
    released: bool,
}

impl RunGuard {
    /// Applies the terminal state and clears the running flag under one lock
    fn release(mut self, status: RunStatus, progress: Option<u8>) {
        let mut state = lock_state(&self.state);
        state.status = status;
        state.is_running = false;
        state.current_step = None;
        if let Some(progress) = progress {
            state.progress = progress;
        }
        self.released = true;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let mut state = lock_state(&self.state);
        state.is_running = false;
        if state.status == RunStatus::Running {
            state.status = RunStatus::Failed;
        }
    }
}

fn lock_state(state: &Mutex<RunState>) -> MutexGuard<'_, RunState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything the run task needs, detached from the orchestrator
struct ActiveRun {
    run_id: Uuid,
    runner: Arc<dyn ProcessRunner>,
    observer: Arc<dyn ProgressObserver>,
    filter: Arc<OutputFilter>,
    config: OrchestratorConfig,
    state: Arc<Mutex<RunState>>,
}

impl ActiveRun {
    async fn execute(self, steps: Vec<BuildStep>, guard: RunGuard) -> RunReport {
        let start = Instant::now();
        info!(steps = steps.len(), "Starting build run");

        let mut reports = Vec::with_capacity(steps.len());
        let result = self.run_steps(&steps, &mut reports).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                let failed = reports.iter().filter(|r| !r.outcome.is_success()).count();
                self.finish(guard, RunStatus::Completed, Some(MAX_PROGRESS));
                if failed == 0 {
                    self.emit(
                        LogKind::RunCompleted,
                        "=== BUILD PROCESS COMPLETED SUCCESSFULLY ===",
                    );
                } else {
                    self.emit(
                        LogKind::RunCompleted,
                        format!(
                            "=== BUILD PROCESS COMPLETED ({} of {} steps reported problems) ===",
                            failed,
                            reports.len()
                        ),
                    );
                }
                info!(failed, duration_ms, "Build run complete");

                RunReport {
                    run_id: self.run_id,
                    status: RunStatus::Completed,
                    steps: reports,
                    duration_ms,
                    failure: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "Build run failed");
                self.finish(guard, RunStatus::Failed, None);
                self.emit(LogKind::RunFailed, format!("BUILD FAILED: {}", e));
                self.emit(LogKind::Info, "=== BUILD PROCESS TERMINATED ===");

                RunReport {
                    run_id: self.run_id,
                    status: RunStatus::Failed,
                    steps: reports,
                    duration_ms,
                    failure: Some(e.to_string()),
                }
            }
        }
    }

    async fn run_steps(
        &self,
        steps: &[BuildStep],
        reports: &mut Vec<StepReport>,
    ) -> Result<(), RunError> {
        for (index, step) in steps.iter().enumerate() {
            step.validate(index)?;

            let report = self.run_step(index, steps.len(), step).await;
            reports.push(report);

            if !self.config.step_delay.is_zero() {
                tokio::time::sleep(self.config.step_delay).await;
            }
        }
        Ok(())
    }

    async fn run_step(&self, index: usize, total: usize, step: &BuildStep) -> StepReport {
        let started = Instant::now();
        info!(step = step.name(), position = index + 1, total, "Running step");

        self.emit(
            LogKind::StepStarted,
            format!("[{}/{}] {}", index + 1, total, step.name()),
        );
        self.emit(LogKind::Command, format!("Executing: {}", step.command()));
        lock_state(&self.state).current_step = Some(step.name().to_string());

        let working_dir = step
            .working_dir()
            .unwrap_or(self.config.working_dir.as_path());
        let (tx, mut rx) = mpsc::unbounded_channel();

        // Lines are forwarded while the process is still running
        let forward = async {
            while let Some(line) = rx.recv().await {
                self.forward_line(line);
            }
        };
        let (result, ()) = tokio::join!(self.runner.run(step.command(), working_dir, tx), forward);

        let outcome = match result {
            Ok(result) => {
                if let ProcessOutcome::LaunchFailed(reason) = &result.outcome {
                    self.emit(
                        LogKind::StepFailed,
                        format!("Step '{}' could not be started: {}", step.name(), reason),
                    );
                } else {
                    self.emit(LogKind::ExitCode, format!("Exit code: {}", result.exit_code()));
                    if result.success() {
                        self.emit(LogKind::Info, "Step completed successfully");
                    } else {
                        self.emit(
                            LogKind::Warning,
                            format!("Step completed with exit code: {}", result.exit_code()),
                        );
                        if !result.stderr.trim().is_empty() {
                            self.emit(LogKind::Warning, result.stderr.clone());
                        }
                    }
                }
                StepOutcome::from(&result)
            }
            Err(e) => {
                warn!(step = step.name(), error = %e, "Step host fault");
                self.emit(
                    LogKind::StepFailed,
                    format!("Exception during step '{}': {}", step.name(), e),
                );
                StepOutcome::HostFault(e.to_string())
            }
        };
        debug!(step = step.name(), %outcome, "Step settled");

        self.set_progress(step.target_progress());

        StepReport {
            name: step.name().to_string(),
            command: step.command().to_string(),
            outcome,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    fn forward_line(&self, line: OutputLine) {
        if let Some(reason) = self.filter.classify(&line.text) {
            trace!(%reason, stream = %line.stream, "Suppressed output line");
            return;
        }
        let kind = match line.stream {
            Stream::Stdout => LogKind::Output,
            Stream::Stderr => LogKind::ErrorOutput,
        };
        self.emit(kind, line.text);
    }

    fn set_progress(&self, percent: u8) {
        lock_state(&self.state).progress = percent;
        self.observer.on_progress(percent);
    }

    fn finish(&self, guard: RunGuard, status: RunStatus, progress: Option<u8>) {
        guard.release(status, progress);
        if let Some(progress) = progress {
            self.observer.on_progress(progress);
        }
        self.observer.on_status_changed(status);
    }

    fn emit(&self, kind: LogKind, text: impl Into<String>) {
        self.observer.on_log_line(&LogEntry::new(kind, text));
    }
}
