//! Build run orchestration
//!
//! [`BuildOrchestrator`] owns the run state machine:
//!
//! ```text
//! Ready -> Running -> Completed | Failed
//!   ^                      |
//!   +------- clear() ------+
//! ```
//!
//! A new run may also start directly from `Completed` or `Failed`.

mod engine;
mod report;
mod state;

pub use engine::{BuildOrchestrator, OrchestratorConfig, RunError, RunHandle, DEFAULT_STEP_DELAY};
pub use report::{RunOutcome, RunReport, StepOutcome, StepReport};
pub use state::{RunState, RunStatus};
