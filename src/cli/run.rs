//! CLI entry point and dispatch
//!
//! `run()` parses arguments, discovers config, installs tracing, builds the
//! tokio runtime and dispatches. It prints all output, including errors, and
//! returns the exit code for main.rs to apply.

use clap::Parser;

use super::args::{Cli, Commands};
use super::commands;
use crate::{CliArgs, Config, ExitCode};
use architect_utils::logging::{LogFormat, init_tracing};

pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        max_attempts: cli.max_attempts,
        attempt_timeout_secs: cli.attempt_timeout,
        versions_dir: cli.versions_dir.clone(),
        verbose: cli.verbose.then_some(true),
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("✗ {err:#}");
            return Err(ExitCode::CLI_ARGS);
        }
    };

    let format = match config.defaults.log_format.as_deref() {
        Some("json") => LogFormat::Json,
        _ => LogFormat::Compact,
    };
    if let Err(e) = init_tracing(config.verbose(), format) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    rt.block_on(async {
        match cli.command {
            Commands::Generate {
                artifact,
                prompt_file,
                threshold,
                json,
            } => {
                commands::generate(&config, &artifact, prompt_file.as_deref(), threshold, json)
                    .await
            }
            Commands::Validate {
                artifact,
                file,
                threshold,
                json,
            } => commands::validate(&config, &artifact, &file, threshold, json),
            Commands::Candidates { artifact } => commands::candidates(&config, &artifact),
            Commands::Versions { artifact, json } => commands::versions(&config, &artifact, json),
            Commands::Restore { artifact, version } => commands::restore(&config, &artifact, version),
            Commands::Config => commands::show_config(&config),
        }
    })
}
