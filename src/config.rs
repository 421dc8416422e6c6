//! Configuration management for oasis-build
//!
//! Engine settings are loaded from environment variables with sensible
//! defaults. Command-line flags override individual values afterwards.
//!
//! # Environment Variables
//!
//! - `OASIS_STEP_DELAY_MS`: Pause after each step - default: "500"
//! - `OASIS_WORKING_DIR`: Default working directory for steps - default: current directory
//! - `OASIS_SHELL`: Shell invocation used for commands, e.g. "bash -c" - default: "cmd /C" on Windows, "sh -c" elsewhere
//! - `OASIS_STEP_TIMEOUT_SECS`: Kill steps running longer than this - default: unset (no timeout)
//! - `OASIS_FILTER_OUTPUT`: Drop shell prompt and banner lines (true|false) - default: "true"
//! - `OASIS_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use oasis_build::EngineConfig;
//!
//! let config = EngineConfig::default();
//! config.validate().expect("Invalid configuration");
//! let orchestrator_config = config.orchestrator_config();
//! ```

use crate::filter::OutputFilter;
use crate::orchestrator::{OrchestratorConfig, DEFAULT_STEP_DELAY};
use crate::process::{Shell, ShellRunner};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_FILTER_OUTPUT: bool = true;
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Settings for building a runner, filter and orchestrator
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pause inserted after every step
    pub step_delay: Duration,

    /// Default working directory for steps without their own
    pub working_dir: PathBuf,

    /// Shell that interprets step commands
    pub shell: Shell,

    /// Optional per-step timeout; `None` waits forever
    pub step_timeout: Option<Duration>,

    /// Whether shell noise is filtered from output
    pub filter_output: bool,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for EngineConfig {
    /// Loads from `OASIS_*` environment variables, ignoring unparsable values
    fn default() -> Self {
        let step_delay = env::var("OASIS_STEP_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_STEP_DELAY);

        let working_dir = env::var("OASIS_WORKING_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        let shell = env::var("OASIS_SHELL")
            .ok()
            .and_then(|v| Shell::parse(&v))
            .unwrap_or_default();

        let step_timeout = env::var("OASIS_STEP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let filter_output = env::var("OASIS_FILTER_OUTPUT")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(DEFAULT_FILTER_OUTPUT);

        let log_level = env::var("OASIS_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            step_delay,
            working_dir,
            shell,
            step_timeout,
            filter_output,
            log_level,
        }
    }
}

impl EngineConfig {
    /// Like [`EngineConfig::default`] but reports unparsable values instead of ignoring them
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::default();

        check_parse::<u64>("OASIS_STEP_DELAY_MS")?;
        check_parse::<u64>("OASIS_STEP_TIMEOUT_SECS")?;
        check_parse::<bool>("OASIS_FILTER_OUTPUT")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level '{}'. Valid levels: {}",
                self.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        if !self.working_dir.is_dir() {
            return Err(ConfigError::ValidationFailed(format!(
                "Working directory does not exist: {}",
                self.working_dir.display()
            )));
        }

        if self.shell.program().trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Shell program cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::default()
            .with_working_dir(self.working_dir.clone())
            .with_step_delay(self.step_delay)
    }

    pub fn runner(&self) -> ShellRunner {
        ShellRunner::new(self.shell.clone()).with_timeout(self.step_timeout)
    }

    pub fn output_filter(&self) -> OutputFilter {
        if self.filter_output {
            OutputFilter::default()
        } else {
            OutputFilter::passthrough()
        }
    }
}

fn check_parse<T>(var: &str) -> Result<(), ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match env::var(var) {
        Ok(value) => value
            .parse::<T>()
            .map(|_| ())
            .map_err(|e| ConfigError::ParseError {
                field: var.to_string(),
                error: e.to_string(),
            }),
        Err(_) => Ok(()),
    }
}

impl fmt::Display for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "oasis-build configuration:")?;
        writeln!(f, "  Shell: {}", self.shell)?;
        writeln!(f, "  Working directory: {}", self.working_dir.display())?;
        writeln!(f, "  Step delay: {}ms", self.step_delay.as_millis())?;
        match self.step_timeout {
            Some(timeout) => writeln!(f, "  Step timeout: {}s", timeout.as_secs())?,
            None => writeln!(f, "  Step timeout: none")?,
        }
        writeln!(f, "  Output filter: {}", self.filter_output)?;
        write!(f, "  Log level: {}", self.log_level)
    }
}
