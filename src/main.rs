use oasis_build::cli::commands::{CliArgs, Commands};
use oasis_build::cli::handlers::{
    handle_build, handle_config, handle_exec, handle_filter, handle_run, handle_verify,
};
use oasis_build::util::{init_logging, LoggingConfig};
use oasis_build::{NAME, VERSION};

use clap::Parser;
use std::process;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(LoggingConfig::for_cli(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Run(run_args) => handle_run(run_args, args.quiet).await,
        Commands::Exec(exec_args) => handle_exec(exec_args, args.quiet).await,
        Commands::Verify(verify_args) => handle_verify(verify_args, args.quiet).await,
        Commands::Build(build_args) => handle_build(build_args, args.quiet).await,
        Commands::Filter(filter_args) => handle_filter(filter_args).await,
        Commands::Config => handle_config(),
    };

    process::exit(exit_code);
}
