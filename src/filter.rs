//! Shell noise filter for process output
//!
//! Build commands run through an interactive-style shell tend to echo their
//! prompt (`C:\work>`) and print banner separators. [`OutputFilter`] drops those
//! lines before they reach an observer. It is a heuristic over common echo
//! patterns and not a console parser; unusual directory names can slip through
//! or be dropped.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Prompt tails recognised out of the box
pub const DEFAULT_PROMPT_TAILS: &[&str] = &[
    "Windows>",
    "system32>",
    "System32>",
    "Program Files>",
    "Users>",
];

/// Which rule matched a suppressed line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    Blank,
    PromptEcho,
    PathPrompt,
    Separator,
    PromptTail,
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SuppressReason::Blank => "blank line",
            SuppressReason::PromptEcho => "prompt echo",
            SuppressReason::PathPrompt => "path prompt",
            SuppressReason::Separator => "separator",
            SuppressReason::PromptTail => "prompt tail",
        };
        write!(f, "{}", name)
    }
}

fn prompt_echo_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[A-Za-z]:[^>]*>.*$").expect("valid regex"))
}

fn separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[=\-\s]+$").expect("valid regex"))
}

/// Predicate deciding which output lines are noise
#[derive(Debug, Clone)]
pub struct OutputFilter {
    enabled: bool,
    prompt_tails: Vec<String>,
}

impl Default for OutputFilter {
    fn default() -> Self {
        Self {
            enabled: true,
            prompt_tails: DEFAULT_PROMPT_TAILS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl OutputFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A filter that keeps every line
    pub fn passthrough() -> Self {
        Self {
            enabled: false,
            prompt_tails: Vec::new(),
        }
    }

    /// Adds prompt tails on top of [`DEFAULT_PROMPT_TAILS`]
    pub fn with_prompt_tails<I, S>(mut self, tails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prompt_tails.extend(tails.into_iter().map(Into::into));
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn should_suppress(&self, line: &str) -> bool {
        self.classify(line).is_some()
    }

    /// Returns the first rule that suppresses `line`, in priority order
    pub fn classify(&self, line: &str) -> Option<SuppressReason> {
        if !self.enabled {
            return None;
        }

        if line.trim().is_empty() {
            return Some(SuppressReason::Blank);
        }
        if prompt_echo_regex().is_match(line) {
            return Some(SuppressReason::PromptEcho);
        }
        if line.contains(":\\") && line.contains('>') {
            return Some(SuppressReason::PathPrompt);
        }
        if separator_regex().is_match(line) {
            return Some(SuppressReason::Separator);
        }
        if self.prompt_tails.iter().any(|tail| line.contains(tail.as_str())) {
            return Some(SuppressReason::PromptTail);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        empty = { "", SuppressReason::Blank },
        spaces = { "   \t ", SuppressReason::Blank },
        users_prompt = { r"C:\Users\me>", SuppressReason::PromptEcho },
        prompt_with_command = { r"D:\src\app>mvn clean", SuppressReason::PromptEcho },
        lowercase_drive = { r"c:\work>", SuppressReason::PromptEcho },
        embedded_path_prompt = { r"(venv) C:\proj> dir", SuppressReason::PathPrompt },
        equals_banner = { "====================", SuppressReason::Separator },
        dash_banner = { "---- ----", SuppressReason::Separator },
        system32_tail = { "Microsoft Windows\\System32>", SuppressReason::PromptTail },
    )]
    fn test_suppressed(line: &str, reason: SuppressReason) {
        let filter = OutputFilter::new();
        assert_eq!(filter.classify(line), Some(reason));
        assert!(filter.should_suppress(line));
    }

    #[parameterized(
        build_succeeded = { "Build succeeded." },
        maven_info = { "[INFO] BUILD SUCCESS" },
        arrow_without_path = { "a -> b" },
        java_version = { "openjdk version \"21.0.2\" 2024-01-16" },
        colon_without_prompt = { "Total time: 3.2 s" },
    )]
    fn test_kept(line: &str) {
        assert!(!OutputFilter::new().should_suppress(line));
    }

    #[test]
    fn test_custom_prompt_tail() {
        let filter = OutputFilter::new().with_prompt_tails(["workspace>"]);
        assert_eq!(
            filter.classify("/home/me/workspace> ls"),
            Some(SuppressReason::PromptTail)
        );
        assert!(!OutputFilter::new().should_suppress("/home/me/workspace> ls"));
    }

    #[test]
    fn test_passthrough_keeps_everything() {
        let filter = OutputFilter::passthrough();
        assert!(!filter.is_enabled());
        assert!(!filter.should_suppress(""));
        assert!(!filter.should_suppress(r"C:\Users\me>"));
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(SuppressReason::PromptEcho.to_string(), "prompt echo");
    }
}
