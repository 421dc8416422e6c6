//! Step-list sources
//!
//! The orchestrator does not decide what to run. Step lists come from here:
//! files on disk, a single custom command, the stock source verification
//! plan that checks the Java toolchain and both source locations, or a Java
//! build driven by the tool the caller names.

use crate::process::Shell;
use crate::step::BuildStep;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("{0} path is required")]
    MissingPath(&'static str),

    #[error("Custom command cannot be empty")]
    EmptyCommand,

    #[error("Failed to read step list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unsupported step list format: {0} (expected .toml, .yaml, .yml or .json)")]
    UnsupportedFormat(PathBuf),

    #[error("Failed to parse step list: {0}")]
    Parse(String),
}

/// Serialization format of a step-list file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    Toml,
    Yaml,
    Json,
}

impl ListFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(ListFormat::Toml),
            "yaml" | "yml" => Some(ListFormat::Yaml),
            "json" => Some(ListFormat::Json),
            _ => None,
        }
    }
}

/// Ordered steps as stored in a step-list file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepList {
    #[serde(default)]
    pub steps: Vec<BuildStep>,
}

impl StepList {
    /// Reads a step list, picking the format from the file extension.
    ///
    /// Steps are not validated here; a malformed step aborts the run that reaches it.
    pub fn from_path(path: &Path) -> Result<Self, PlanError> {
        let format = ListFormat::from_path(path)
            .ok_or_else(|| PlanError::UnsupportedFormat(path.to_path_buf()))?;
        let content = fs::read_to_string(path).map_err(|source| PlanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let list = Self::parse(&content, format)?;
        debug!(path = %path.display(), steps = list.steps.len(), "Loaded step list");
        Ok(list)
    }

    pub fn parse(content: &str, format: ListFormat) -> Result<Self, PlanError> {
        match format {
            ListFormat::Toml => toml::from_str(content).map_err(|e| PlanError::Parse(e.to_string())),
            ListFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| PlanError::Parse(e.to_string()))
            }
            ListFormat::Json => {
                serde_json::from_str(content).map_err(|e| PlanError::Parse(e.to_string()))
            }
        }
    }

    pub fn into_steps(self) -> Vec<BuildStep> {
        self.steps
    }
}

/// Command dialect used when generating step commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFlavor {
    Cmd,
    Posix,
}

impl ShellFlavor {
    pub fn host() -> Self {
        if cfg!(windows) {
            ShellFlavor::Cmd
        } else {
            ShellFlavor::Posix
        }
    }

    pub fn for_shell(shell: &Shell) -> Self {
        // Split on both separators so Windows paths classify on any host
        let program = shell
            .program()
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if program == "cmd" || program == "cmd.exe" {
            ShellFlavor::Cmd
        } else {
            ShellFlavor::Posix
        }
    }

    fn list(self, path: &Path) -> String {
        match self {
            ShellFlavor::Cmd => format!("dir {}", quote(path)),
            ShellFlavor::Posix => format!("ls -la {}", quote(path)),
        }
    }

    fn find_build_files(self, path: &Path) -> String {
        match self {
            ShellFlavor::Cmd => format!(
                "dir {} | findstr /i \"pom.xml build.gradle\"",
                quote(path)
            ),
            ShellFlavor::Posix => format!(
                "ls -la {} | grep -i -E \"pom.xml|build.gradle\"",
                quote(path)
            ),
        }
    }

    fn in_dir(self, path: &Path, command: &str) -> String {
        match self {
            ShellFlavor::Cmd => format!("cd /d {} && {}", quote(path), command),
            ShellFlavor::Posix => format!("cd {} && {}", quote(path), command),
        }
    }

    fn make_build_dir(self) -> &'static str {
        match self {
            ShellFlavor::Cmd => "mkdir build 2>nul",
            ShellFlavor::Posix => "mkdir -p build",
        }
    }

    fn find_java_files(self) -> &'static str {
        match self {
            ShellFlavor::Cmd => "dir /s *.java",
            ShellFlavor::Posix => "find . -name \"*.java\"",
        }
    }

    fn compile_java(self) -> &'static str {
        match self {
            ShellFlavor::Cmd => "javac -d build src\\*.java",
            ShellFlavor::Posix => "javac -d build src/*.java",
        }
    }

    fn list_current(self, pattern: Option<&str>) -> String {
        match (self, pattern) {
            (ShellFlavor::Cmd, Some(p)) => format!("dir {}", p),
            (ShellFlavor::Cmd, None) => "dir".to_string(),
            (ShellFlavor::Posix, Some(p)) => format!("ls -la {}", p),
            (ShellFlavor::Posix, None) => "ls -la".to_string(),
        }
    }
}

/// Build tool driving a Java build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JavaTool {
    Maven,
    Gradle,
    /// Plain `javac` + `jar` for projects without a build file
    Javac,
}

impl fmt::Display for JavaTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JavaTool::Maven => write!(f, "maven"),
            JavaTool::Gradle => write!(f, "gradle"),
            JavaTool::Javac => write!(f, "javac"),
        }
    }
}

fn quote(path: &Path) -> String {
    format!("\"{}\"", path.display())
}

fn require(path: &Path, label: &'static str) -> Result<(), PlanError> {
    if path.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(PlanError::MissingPath(label));
    }
    Ok(())
}

/// Eight-step check of the Java toolchain and both source locations
pub fn verification_plan(
    java_source: &Path,
    native_source: &Path,
    flavor: ShellFlavor,
) -> Result<Vec<BuildStep>, PlanError> {
    require(java_source, "Java source")?;
    require(native_source, "Native source")?;

    let native_dir = native_source
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    Ok(vec![
        BuildStep::new("Verifying Java installation...", "java -version", 10),
        BuildStep::new("Checking build tools...", "mvn --version", 20),
        BuildStep::new("Analyzing Java source directory...", flavor.list(java_source), 30),
        BuildStep::new(
            "Looking for build configuration...",
            flavor.find_build_files(java_source),
            40,
        ),
        BuildStep::new("Analyzing native source...", flavor.list(native_source), 50),
        BuildStep::new(
            "Compiling Java sources...",
            flavor.in_dir(java_source, &flavor.list_current(Some("*.java"))),
            70,
        ),
        BuildStep::new(
            "Preparing native build...",
            flavor.in_dir(native_dir, &flavor.list_current(None)),
            85,
        ),
        BuildStep::new(
            "Build process completed",
            "echo Build finished successfully!",
            100,
        ),
    ])
}

/// Builds the Java project in `java_source` with `tool`; every step runs from that directory
pub fn java_build_plan(
    java_source: &Path,
    tool: JavaTool,
    flavor: ShellFlavor,
) -> Result<Vec<BuildStep>, PlanError> {
    require(java_source, "Java source")?;

    let step = |name: &str, command: &str, progress: u8| {
        BuildStep::new(name, flavor.in_dir(java_source, command), progress)
    };

    let steps = match tool {
        JavaTool::Maven => vec![
            step("Maven clean...", "mvn clean", 25),
            step("Maven compile...", "mvn compile", 50),
            step("Maven package...", "mvn package", 75),
            step("Maven install...", "mvn install", 100),
        ],
        JavaTool::Gradle => vec![
            step("Gradle clean...", "gradle clean", 25),
            step("Gradle compileJava...", "gradle compileJava", 50),
            step("Gradle build...", "gradle build", 100),
        ],
        JavaTool::Javac => vec![
            step("Creating build directory...", flavor.make_build_dir(), 20),
            step("Finding Java files...", flavor.find_java_files(), 40),
            step("Compiling Java files...", flavor.compile_java(), 80),
            step("Creating JAR file...", "jar cf output.jar -C build .", 100),
        ],
    };
    debug!(%tool, steps = steps.len(), "Planned Java build");
    Ok(steps)
}

/// A single user supplied command run as the whole build
pub fn custom_command(command: &str) -> Result<Vec<BuildStep>, PlanError> {
    if command.trim().is_empty() {
        return Err(PlanError::EmptyCommand);
    }
    Ok(vec![BuildStep::new(
        "Executing custom build command...",
        command.trim(),
        100,
    )])
}
