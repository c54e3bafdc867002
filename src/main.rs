//! waveq CLI
//!
//! Command-line interface for the waveq equalizer pipeline.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::debug;

use waveq::cli::{commands, Cli, Commands};
use waveq::{EngineConfig, WaveqError};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logger; RUST_LOG still wins over the default
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    debug!("waveq v{}", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Info { input } => {
            commands::info(&input).with_context(|| format!("reading {}", input.display()))
        }
        Commands::Eq {
            input,
            output,
            gains,
            q_factors,
            mode,
            pad,
        } => commands::equalize(
            &input,
            &output,
            &gains,
            &q_factors,
            mode.map(Into::into),
            pad,
            &config,
        )
        .with_context(|| format!("equalizing {}", input.display())),
        Commands::Spectrum {
            input,
            offset,
            window,
            top,
            json,
        } => commands::spectrum(&input, offset, window, top, json, &config)
            .with_context(|| format!("analyzing {}", input.display())),
    }
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<WaveqError>() {
        Some(waveq_err) => {
            eprintln!("error [{}]: {}", waveq_err.error_code(), waveq_err.friendly_message());
            eprintln!("  while {}", err);
            for suggestion in waveq_err.recovery_suggestions() {
                eprintln!("  - {}", suggestion);
            }
        }
        None => eprintln!("error: {:#}", err),
    }
}
