// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Turnstile CLI
//!
//! The `turnstile` binary checks admission manifests and exercises them
//! locally before they are deployed alongside a service.
//!
//! ## Commands
//!
//! - `turnstile validate <manifest>` - parse, resolve and preload every operation
//! - `turnstile simulate <manifest> --operation Owner.op --calls N --hold-ms M` -
//!   fire concurrent calls through the pipeline and report admissions vs. fallbacks

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

mod commands;

use commands::{SimulateArgs, ValidateArgs};

/// Turnstile - operation admission control
#[derive(Parser)]
#[command(name = "turnstile")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "TURNSTILE_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an admission manifest
    #[command(name = "validate")]
    Validate(ValidateArgs),

    /// Run concurrent calls through a manifest's pipeline
    #[command(name = "simulate")]
    Simulate(SimulateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;
    debug!("turnstile {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Validate(args) => commands::validate::execute(args).await,
        Commands::Simulate(args) => commands::simulate::execute(args).await,
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
