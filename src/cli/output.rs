//! Terminal rendering of runs and run reports
//!
//! [`TerminalObserver`] prints the live build log and drives an `indicatif`
//! progress bar. [`OutputFormatter`] renders the final [`RunReport`] as JSON,
//! YAML or human-readable text.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;

use crate::orchestrator::{RunReport, RunStatus, StepOutcome};
use crate::progress::{LogEntry, LogKind, ProgressObserver};

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Output formatter for run reports
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_json(report),
            OutputFormat::Yaml => self.format_yaml(report),
            OutputFormat::Human => self.format_human(report),
        }
    }

    fn format_json(&self, report: &RunReport) -> Result<String> {
        serde_json::to_string_pretty(report).context("Failed to serialize run report to JSON")
    }

    fn format_yaml(&self, report: &RunReport) -> Result<String> {
        serde_yaml::to_string(report).context("Failed to serialize run report to YAML")
    }

    fn format_human(&self, report: &RunReport) -> Result<String> {
        let mut output = String::new();

        let header = match report.status {
            RunStatus::Completed if report.is_clean() => "\u{2713} Build Report",
            RunStatus::Completed => "\u{26A0} Build Report (Problems Reported)",
            _ => "\u{2717} Build Report (Failed)",
        };
        output.push_str(header);
        output.push('\n');
        output.push_str(&"\u{2501}".repeat(42));
        output.push_str("\n\n");

        output.push_str(&format!("Run:     {}\n", report.run_id));
        output.push_str(&format!("Status:  {}\n\n", report.status));

        if report.steps.is_empty() {
            output.push_str("Steps: (none run)\n");
        } else {
            output.push_str("Steps:\n");
            for (i, step) in report.steps.iter().enumerate() {
                let is_last = i == report.steps.len() - 1;
                let connector = if is_last { "\u{2514}" } else { "\u{251C}" };
                let mark = match step.outcome {
                    StepOutcome::Succeeded => "\u{2713}",
                    _ => "\u{2717}",
                };
                output.push_str(&format!(
                    "{}\u{2500} {} {} ({}, {}ms)\n",
                    connector, mark, step.name, step.outcome, step.duration_ms
                ));
            }
        }

        if let Some(failure) = &report.failure {
            output.push_str(&format!("\nFailure: {}\n", failure));
        }

        output.push_str(&format!(
            "\n{} of {} steps reported problems\n",
            report.failed_steps(),
            report.steps.len()
        ));
        output.push_str(&format!("Processed in {}ms\n", report.duration_ms));

        Ok(output)
    }
}

/// Prints log entries and shows progress on the terminal.
///
/// The log goes to stdout, or to stderr when stdout carries a machine-readable
/// report. In quiet mode only problem entries are printed.
pub struct TerminalObserver {
    bar: Option<ProgressBar>,
    to_stderr: bool,
    quiet: bool,
}

impl TerminalObserver {
    pub fn new(show_progress: bool, to_stderr: bool, quiet: bool) -> Self {
        let bar = show_progress.then(|| {
            let bar = ProgressBar::new(100);
            let style = ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style);
            bar
        });
        Self {
            bar,
            to_stderr,
            quiet,
        }
    }

    /// Plain output with no progress bar
    pub fn plain(to_stderr: bool, quiet: bool) -> Self {
        Self::new(false, to_stderr, quiet)
    }

    pub fn has_progress_bar(&self) -> bool {
        self.bar.is_some()
    }

    fn print(&self, line: &str) {
        if let Some(bar) = &self.bar {
            if !bar.is_hidden() {
                bar.println(line);
                return;
            }
        }
        // Broken pipes are not worth failing the build over
        if self.to_stderr {
            let _ = writeln!(std::io::stderr(), "{}", line);
        } else {
            let _ = writeln!(std::io::stdout(), "{}", line);
        }
    }
}

/// Renders an entry the way the terminal log shows it
pub fn render_entry(entry: &LogEntry) -> String {
    let time = entry.timestamp.format("%H:%M:%S%.3f");
    match entry.kind {
        LogKind::Output => format!("[{}]   | {}", time, entry.text),
        LogKind::ErrorOutput => format!("[{}]   ! {}", time, entry.text),
        LogKind::Warning | LogKind::StepFailed | LogKind::RunFailed => {
            format!("[{}] \u{26A0} {}", time, entry.text)
        }
        _ => entry.to_string(),
    }
}

impl ProgressObserver for TerminalObserver {
    fn on_log_line(&self, entry: &LogEntry) {
        if self.quiet && !entry.kind.is_problem() {
            return;
        }
        if entry.kind == LogKind::StepStarted {
            if let Some(bar) = &self.bar {
                bar.set_message(entry.text.clone());
            }
        }
        self.print(&render_entry(entry));
    }

    fn on_progress(&self, percent: u8) {
        if let Some(bar) = &self.bar {
            bar.set_position(u64::from(percent));
        }
    }

    fn on_status_changed(&self, status: RunStatus) {
        let Some(bar) = &self.bar else {
            return;
        };
        match status {
            RunStatus::Completed => bar.finish_with_message("done"),
            RunStatus::Failed => bar.abandon_with_message("failed"),
            RunStatus::Ready => bar.reset(),
            RunStatus::Running => {}
        }
    }

    fn on_log_cleared(&self) {
        if let Some(bar) = &self.bar {
            bar.set_message("");
        }
    }
}
