use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::plan::JavaTool;

/// Sequential build-step runner with live process output
#[derive(Parser, Debug)]
#[command(
    name = "oasis-build",
    about = "Sequential build-step runner with live process output",
    version,
    long_about = "oasis-build runs an ordered list of build steps, one shell command at a \
                  time, streaming filtered output and progress as each step runs. Failed \
                  steps are reported and the remaining steps still run."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only show problems"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run the steps of a step-list file",
        long_about = "Runs every step of a TOML, YAML or JSON step-list file in order.\n\n\
                      Examples:\n  \
                      oasis-build run steps.toml\n  \
                      oasis-build run build.yaml --working-dir ./app\n  \
                      oasis-build run steps.json --format json --no-progress"
    )]
    Run(RunArgs),

    #[command(
        about = "Run a single custom build command",
        long_about = "Runs one shell command line as a one-step build.\n\n\
                      Examples:\n  \
                      oasis-build exec \"mvn clean package\"\n  \
                      oasis-build exec \"cd app && gradle build\""
    )]
    Exec(ExecArgs),

    #[command(
        about = "Verify the Java toolchain and source locations",
        long_about = "Runs the stock verification plan: Java and Maven versions, the Java \
                      source directory and its build files, and the native source.\n\n\
                      Examples:\n  \
                      oasis-build verify --java-source ./app --native-source ./native/lib.c"
    )]
    Verify(VerifyArgs),

    #[command(
        about = "Build a Java project with Maven, Gradle or javac",
        long_about = "Runs the build steps of the chosen tool from the Java source directory. \
                      The tool is not detected; pass the one the project uses.\n\n\
                      Examples:\n  \
                      oasis-build build --java-source ./app --tool maven\n  \
                      oasis-build build --java-source ./app --tool javac --format json"
    )]
    Build(BuildArgs),

    #[command(
        about = "Filter shell noise from stdin",
        long_about = "Reads lines from stdin and prints only the lines a build log would show.\n\n\
                      Examples:\n  \
                      mvn package | oasis-build filter\n  \
                      oasis-build filter --explain < build.log"
    )]
    Filter(FilterArgs),

    #[command(about = "Show the effective configuration")]
    Config,
}

/// Options shared by every command that runs steps
#[derive(Args, Debug, Clone)]
pub struct RunOptions {
    #[arg(
        short = 'C',
        long,
        value_name = "DIR",
        help = "Default working directory for steps"
    )]
    pub working_dir: Option<PathBuf>,

    #[arg(long, value_name = "MS", help = "Pause after each step in milliseconds")]
    pub step_delay_ms: Option<u64>,

    #[arg(long, value_name = "SHELL", help = "Shell invocation for commands, e.g. \"bash -c\"")]
    pub shell: Option<String>,

    #[arg(long, value_name = "SECONDS", help = "Kill steps that run longer than this")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Show shell prompt and banner lines")]
    pub no_filter: bool,

    #[arg(long, help = "Do not draw a progress bar")]
    pub no_progress: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Format of the final run report"
    )]
    pub format: OutputFormatArg,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(value_name = "FILE", help = "Step-list file (.toml, .yaml, .yml or .json)")]
    pub steps_file: PathBuf,

    #[command(flatten)]
    pub options: RunOptions,
}

#[derive(Args, Debug, Clone)]
pub struct ExecArgs {
    #[arg(value_name = "COMMAND", help = "Shell command line to run")]
    pub command: String,

    #[command(flatten)]
    pub options: RunOptions,
}

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    #[arg(long, value_name = "DIR", help = "Java source directory")]
    pub java_source: PathBuf,

    #[arg(long, value_name = "FILE", help = "Native source file")]
    pub native_source: PathBuf,

    #[command(flatten)]
    pub options: RunOptions,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[arg(long, value_name = "DIR", help = "Java source directory")]
    pub java_source: PathBuf,

    #[arg(long, value_enum, help = "Build tool to drive")]
    pub tool: JavaToolArg,

    #[command(flatten)]
    pub options: RunOptions,
}

#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    #[arg(long, help = "Report suppressed lines and the rule that matched on stderr")]
    pub explain: bool,

    #[arg(
        long = "prompt-tail",
        value_name = "TEXT",
        help = "Additional prompt tail to suppress (repeatable)"
    )]
    pub prompt_tails: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Human,
    Json,
    Yaml,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => super::output::OutputFormat::Human,
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JavaToolArg {
    Maven,
    Gradle,
    Javac,
}

impl From<JavaToolArg> for JavaTool {
    fn from(arg: JavaToolArg) -> Self {
        match arg {
            JavaToolArg::Maven => JavaTool::Maven,
            JavaToolArg::Gradle => JavaTool::Gradle,
            JavaToolArg::Javac => JavaTool::Javac,
        }
    }
}
