//! Command handlers
//!
//! Each handler returns the process exit code: 0 for a clean run, 1 when the
//! run completed but some steps reported problems, 2 when the run failed or
//! the input was invalid.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, Level};

use super::commands::{
    BuildArgs, ExecArgs, FilterArgs, OutputFormatArg, RunArgs, RunOptions, VerifyArgs,
};
use super::output::{OutputFormat, OutputFormatter, TerminalObserver};
use crate::config::EngineConfig;
use crate::filter::OutputFilter;
use crate::orchestrator::{BuildOrchestrator, RunOutcome, RunReport, RunStatus};
use crate::plan::{self, JavaTool, ShellFlavor, StepList};
use crate::process::Shell;
use crate::progress::{FanoutObserver, LoggingObserver, ProgressObserver};
use crate::step::BuildStep;

pub const EXIT_CLEAN: i32 = 0;
pub const EXIT_STEP_PROBLEMS: i32 = 1;
pub const EXIT_FAILED: i32 = 2;

pub async fn handle_run(args: &RunArgs, quiet: bool) -> i32 {
    let steps = match StepList::from_path(&args.steps_file) {
        Ok(list) => list.into_steps(),
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            return EXIT_FAILED;
        }
    };
    info!(
        "Loaded {} steps from {}",
        steps.len(),
        args.steps_file.display()
    );
    execute(steps, &args.options, quiet).await
}

pub async fn handle_exec(args: &ExecArgs, quiet: bool) -> i32 {
    let steps = match plan::custom_command(&args.command) {
        Ok(steps) => steps,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            return EXIT_FAILED;
        }
    };
    execute(steps, &args.options, quiet).await
}

pub async fn handle_verify(args: &VerifyArgs, quiet: bool) -> i32 {
    let config = match engine_config(&args.options) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            return EXIT_FAILED;
        }
    };

    let flavor = ShellFlavor::for_shell(&config.shell);
    let steps = match plan::verification_plan(&args.java_source, &args.native_source, flavor) {
        Ok(steps) => steps,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            return EXIT_FAILED;
        }
    };
    run_steps(steps, config, &args.options, quiet).await
}

pub async fn handle_build(args: &BuildArgs, quiet: bool) -> i32 {
    let config = match engine_config(&args.options) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            return EXIT_FAILED;
        }
    };

    let tool: JavaTool = args.tool.into();
    let flavor = ShellFlavor::for_shell(&config.shell);
    let steps = match plan::java_build_plan(&args.java_source, tool, flavor) {
        Ok(steps) => steps,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            return EXIT_FAILED;
        }
    };
    info!("Building {} with {}", args.java_source.display(), tool);
    run_steps(steps, config, &args.options, quiet).await
}

pub async fn handle_filter(args: &FilterArgs) -> i32 {
    let filter = OutputFilter::default().with_prompt_tails(args.prompt_tails.iter().cloned());
    match filter_stdin(&filter, args.explain).await {
        Ok((kept, dropped)) => {
            debug!(kept, dropped, "Filtered stdin");
            EXIT_CLEAN
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            EXIT_FAILED
        }
    }
}

pub fn handle_config() -> i32 {
    match EngineConfig::from_env() {
        Ok(config) => {
            println!("{}", config);
            EXIT_CLEAN
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            EXIT_FAILED
        }
    }
}

/// Maps a finished run to the process exit code
pub fn exit_code_for(report: &RunReport) -> i32 {
    match report.status {
        RunStatus::Completed if report.is_clean() => EXIT_CLEAN,
        RunStatus::Completed => EXIT_STEP_PROBLEMS,
        _ => EXIT_FAILED,
    }
}

async fn execute(steps: Vec<BuildStep>, options: &RunOptions, quiet: bool) -> i32 {
    let config = match engine_config(options) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            return EXIT_FAILED;
        }
    };
    run_steps(steps, config, options, quiet).await
}

async fn run_steps(
    steps: Vec<BuildStep>,
    config: EngineConfig,
    options: &RunOptions,
    quiet: bool,
) -> i32 {
    let format: OutputFormat = options.format.into();
    let machine_report = options.format != OutputFormatArg::Human;
    let show_progress = !options.no_progress && !quiet && atty::is(atty::Stream::Stderr);

    let terminal = Arc::new(TerminalObserver::new(show_progress, machine_report, quiet));
    let observer: Arc<dyn ProgressObserver> = if tracing::enabled!(Level::DEBUG) {
        Arc::new(
            FanoutObserver::new()
                .with(terminal)
                .with(Arc::new(LoggingObserver)),
        )
    } else {
        terminal
    };
    let orchestrator = BuildOrchestrator::new(Arc::new(config.runner()), observer)
        .with_filter(config.output_filter())
        .with_config(config.orchestrator_config());

    let report = match orchestrator.run_to_completion(steps).await {
        Ok(RunOutcome::Finished(report)) => report,
        Ok(RunOutcome::AlreadyRunning) => {
            error!("Build already running");
            return EXIT_FAILED;
        }
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("Error: {}", e);
            return EXIT_FAILED;
        }
    };

    if machine_report || !quiet {
        match OutputFormatter::new(format).format(&report) {
            Ok(output) => println!("{}", output.trim_end()),
            Err(e) => {
                error!("Failed to format output: {:#}", e);
                return EXIT_FAILED;
            }
        }
    }

    exit_code_for(&report)
}

/// Environment configuration with command-line overrides applied
fn engine_config(options: &RunOptions) -> Result<EngineConfig> {
    let mut config = EngineConfig::from_env().context("Invalid environment configuration")?;

    if let Some(dir) = &options.working_dir {
        config.working_dir = dir.clone();
    }
    if let Some(ms) = options.step_delay_ms {
        config.step_delay = Duration::from_millis(ms);
    }
    if let Some(invocation) = &options.shell {
        config.shell = Shell::parse(invocation)
            .with_context(|| format!("Invalid shell invocation '{}'", invocation))?;
    }
    if let Some(secs) = options.timeout {
        config.step_timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    if options.no_filter {
        config.filter_output = false;
    }

    config.validate().context("Invalid configuration")?;
    debug!("Effective configuration:\n{}", config);
    Ok(config)
}

async fn filter_stdin(filter: &OutputFilter, explain: bool) -> Result<(usize, usize)> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let (mut kept, mut dropped) = (0, 0);

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        match filter.classify(&line) {
            Some(reason) => {
                dropped += 1;
                if explain {
                    eprintln!("[{}] {}", reason, line);
                }
            }
            None => {
                kept += 1;
                println!("{}", line);
            }
        }
    }
    Ok((kept, dropped))
}
