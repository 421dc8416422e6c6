//! Structured logging setup for oasis-build
//!
//! Diagnostics go through `tracing` and are written to stderr, so they never mix
//! with the build log a front end prints on stdout. The subscriber is installed
//! once per process; later calls are ignored.
//!
//! # Example
//!
//! ```no_run
//! use oasis_build::util::logging;
//! use tracing::info;
//!
//! logging::init_from_env();
//! info!(steps = 3, "Build started");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Target prefix of this crate's log events
const CRATE_TARGET: &str = "oasis_build";

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for this crate's events
    pub level: Level,

    /// Emit one JSON object per event instead of text
    pub use_json: bool,

    /// Include the module target (e.g., oasis_build::orchestrator) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,

    /// Include thread ID and name in logs
    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Picks the level from command-line style switches.
    ///
    /// An explicit level wins, then `verbose`, then `quiet`, then `OASIS_LOG_LEVEL`.
    pub fn for_cli(level: Option<&str>, verbose: bool, quiet: bool) -> Self {
        let level = if let Some(level) = level {
            parse_level(level)
        } else if verbose {
            Level::DEBUG
        } else if quiet {
            Level::ERROR
        } else {
            parse_level(&env::var("OASIS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()))
        };

        Self {
            level,
            use_json: json_from_env(),
            include_thread_ids: verbose,
            ..Default::default()
        }
    }
}

/// Parses a log level, falling back to `INFO` for unknown names
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

fn json_from_env() -> bool {
    env::var("OASIS_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false)
}

fn crate_directive(level: Level) -> Directive {
    format!("{}={}", CRATE_TARGET, level)
        .parse()
        .unwrap_or_else(|_| LevelFilter::from_level(level).into())
}

/// Installs the global subscriber; only the first call has an effect
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env().add_directive(crate_directive(config.level));

        // Without RUST_LOG, keep other crates quiet
        if env::var("RUST_LOG").is_err() {
            filter = filter.add_directive(LevelFilter::WARN.into());
        }

        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.include_target)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids)
            .with_thread_names(config.include_thread_ids);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.json())
                .init();
        } else {
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    });
}

/// Initializes logging from `OASIS_LOG_LEVEL`, `OASIS_LOG_JSON` and `RUST_LOG`
pub fn init_from_env() {
    let level_str = env::var("OASIS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    init_logging(LoggingConfig {
        level: parse_level(&level_str),
        use_json: json_from_env(),
        ..Default::default()
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("info"), Level::INFO);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
    }

    #[test]
    fn test_parse_level_case_insensitive() {
        assert_eq!(parse_level("TRACE"), Level::TRACE);
        assert_eq!(parse_level("Debug"), Level::DEBUG);
    }

    #[test]
    fn test_parse_level_invalid() {
        assert_eq!(parse_level("invalid"), Level::INFO);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);
        assert!(config.include_target);
        assert!(!config.include_location);
    }

    #[test]
    #[serial]
    fn test_for_cli_precedence() {
        env::remove_var("OASIS_LOG_LEVEL");
        env::remove_var("OASIS_LOG_JSON");

        assert_eq!(LoggingConfig::for_cli(Some("warn"), true, false).level, Level::WARN);
        assert_eq!(LoggingConfig::for_cli(None, true, false).level, Level::DEBUG);
        assert_eq!(LoggingConfig::for_cli(None, false, true).level, Level::ERROR);
        assert_eq!(LoggingConfig::for_cli(None, false, false).level, Level::INFO);

        env::set_var("OASIS_LOG_LEVEL", "trace");
        assert_eq!(LoggingConfig::for_cli(None, false, false).level, Level::TRACE);
        env::remove_var("OASIS_LOG_LEVEL");
    }

    #[test]
    fn test_crate_directive() {
        let directive = crate_directive(Level::DEBUG).to_string();
        assert!(directive.starts_with("oasis_build="));
        assert!(directive.to_lowercase().ends_with("debug"));
    }
}
