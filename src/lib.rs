//! oasis-build - sequential build-step orchestration
//!
//! This library runs an ordered list of build steps, each a shell command line,
//! one after another. Output is streamed line by line while a process runs,
//! shell noise is filtered out, and progress is reported to an observer after
//! every step. A failing step is reported and the run moves on.
//!
//! # Core Concepts
//!
//! - **Build step**: a named command with the progress percentage reached when
//!   it finishes
//! - **Process runner**: launches one command and streams its output
//! - **Observer**: receives log entries, progress and status changes
//! - **Orchestrator**: owns the run state and guarantees one run at a time
//!
//! # Example Usage
//!
//! ```no_run
//! use oasis_build::{BuildOrchestrator, BuildStep, LoggingObserver, ShellRunner};
//! use std::sync::Arc;
//!
//! # async fn build() -> Result<(), oasis_build::RunError> {
//! let orchestrator = BuildOrchestrator::new(
//!     Arc::new(ShellRunner::default()),
//!     Arc::new(LoggingObserver),
//! );
//!
//! let steps = vec![
//!     BuildStep::new("Clean", "mvn clean", 50),
//!     BuildStep::new("Package", "mvn package", 100),
//! ];
//! let outcome = orchestrator.run_to_completion(steps).await?;
//! if let Some(report) = outcome.report() {
//!     println!("{} steps reported problems", report.failed_steps());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`orchestrator`]: run state machine and step loop
//! - [`process`]: command execution and output streaming
//! - [`progress`]: observer contract and stock observers
//! - [`filter`]: shell noise suppression
//! - [`plan`]: step-list files and stock plans

pub mod cli;
pub mod config;
pub mod filter;
pub mod orchestrator;
pub mod plan;
pub mod process;
pub mod progress;
pub mod step;
pub mod util;

// Re-export key types for convenient access
pub use config::{ConfigError, EngineConfig};
pub use filter::{OutputFilter, SuppressReason};
pub use orchestrator::{
    BuildOrchestrator, OrchestratorConfig, RunError, RunHandle, RunOutcome, RunReport, RunState,
    RunStatus, StepOutcome, StepReport,
};
pub use plan::{JavaTool, PlanError, StepList};
pub use process::{
    OutputLine, ProcessOutcome, ProcessResult, ProcessRunner, RunnerError, Shell, ShellRunner,
    Stream,
};
pub use progress::{LogEntry, LogKind, LoggingObserver, ProgressObserver, RecordingObserver};
pub use step::{BuildStep, StepError};
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
