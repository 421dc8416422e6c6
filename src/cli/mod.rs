pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{
    BuildArgs, CliArgs, Commands, ExecArgs, FilterArgs, RunArgs, RunOptions, VerifyArgs,
};
pub use output::{OutputFormat, OutputFormatter, TerminalObserver};
