//! Build step description
//!
//! A [`BuildStep`] is one named unit of build work: a shell command line and the
//! progress percentage to report once it settles. Steps are immutable after
//! construction and are usually produced by a [`crate::plan`] builder or read
//! from a step-list file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Highest progress value a step may report
pub const MAX_PROGRESS: u8 = 100;

/// Reasons a step cannot be executed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("Step at position {index} has an empty name")]
    EmptyName { index: usize },

    #[error("Step '{name}' has an empty command")]
    EmptyCommand { name: String },

    #[error("Step '{name}' targets {progress}% (must be between 0 and 100)")]
    ProgressOutOfRange { name: String, progress: u8 },
}

/// One unit of build work mapped to a single shell command invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
    name: String,
    command: String,
    #[serde(rename = "progress")]
    target_progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    working_dir: Option<PathBuf>,
}

impl BuildStep {
    pub fn new(name: impl Into<String>, command: impl Into<String>, target_progress: u8) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            target_progress,
            working_dir: None,
        }
    }

    /// Runs the command from `dir` instead of the orchestrator's default directory
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn target_progress(&self) -> u8 {
        self.target_progress
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Checks that the step can be handed to a process runner.
    ///
    /// `index` is the step's position in its list and only feeds the error message.
    pub fn validate(&self, index: usize) -> Result<(), StepError> {
        if self.name.trim().is_empty() {
            return Err(StepError::EmptyName { index });
        }
        if self.command.trim().is_empty() {
            return Err(StepError::EmptyCommand {
                name: self.name.clone(),
            });
        }
        if self.target_progress > MAX_PROGRESS {
            return Err(StepError::ProgressOutOfRange {
                name: self.name.clone(),
                progress: self.target_progress,
            });
        }
        Ok(())
    }
}
