// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Local admission simulation
//!
//! Fires `--calls` concurrent calls at one operation of a manifest. Each real
//! body sleeps for `--hold-ms` so that lock and concurrency guards see
//! overlapping holders; calls that were denied return their fallback instead.

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use colored::Colorize;
use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

use turnstile_core::domain::operation::OperationSignature;
use turnstile_core::infrastructure::manifest_parser::AdmissionManifest;
use turnstile_core::{AdmissionManifestParser, Call, ComponentRegistry};

/// Result produced by the simulated real body
const BODY_RESULT: &str = "__turnstile_body_ran__";

#[derive(Args)]
pub struct SimulateArgs {
    /// Path to the admission manifest
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Operation to call, as Owner.operation
    #[arg(short, long)]
    pub operation: String,

    /// Number of concurrent calls
    #[arg(short = 'n', long, default_value_t = 10)]
    pub calls: usize,

    /// How long each admitted call holds its guards
    #[arg(long, default_value_t = 100)]
    pub hold_ms: u64,

    /// Argument value as name=value; JSON values are parsed, anything else is a string
    #[arg(long = "arg", value_name = "NAME=VALUE")]
    pub args: Vec<String>,
}

/// Outcome counts of one simulation run
#[derive(Debug, Default, PartialEq)]
pub struct SimulationReport {
    pub ran: usize,
    pub fallbacks: BTreeMap<String, usize>,
    pub errors: Vec<String>,
}

impl SimulationReport {
    pub fn fallback_total(&self) -> usize {
        self.fallbacks.values().sum()
    }
}

pub async fn execute(args: SimulateArgs) -> Result<()> {
    let manifest = AdmissionManifestParser::parse_file(&args.manifest)
        .with_context(|| format!("Failed to load manifest {:?}", args.manifest))?;

    let started = Instant::now();
    let report = run(
        &manifest,
        &args.operation,
        args.calls,
        Duration::from_millis(args.hold_ms),
        &args.args,
    )
    .await?;
    let elapsed = started.elapsed();

    println!("{} {} x{}", "Simulated".bold(), args.operation, args.calls);
    println!("  {} {}", "ran:".green(), report.ran);
    println!("  {} {}", "fell back:".yellow(), report.fallback_total());
    for (value, count) in &report.fallbacks {
        println!("    {} x{}", value, count);
    }
    if !report.errors.is_empty() {
        println!("  {} {}", "errors:".red(), report.errors.len());
        for error in &report.errors {
            println!("    {}", error);
        }
    }
    println!("  elapsed: {:?}", elapsed);

    Ok(())
}

/// Run `calls` concurrent calls and tally their outcomes.
pub async fn run(
    manifest: &AdmissionManifest,
    operation: &str,
    calls: usize,
    hold: Duration,
    raw_args: &[String],
) -> Result<SimulationReport> {
    let signature = find_operation(manifest, operation)?;
    let args = build_args(&signature, raw_args)?;
    let orchestrator = manifest.build_orchestrator(ComponentRegistry::with_builtins())?;

    info!("Simulating {} call(s) to {}", calls, signature);

    let results = join_all((0..calls).map(|_| {
        let call = Call::new(signature.clone(), args.clone(), move || async move {
            tokio::time::sleep(hold).await;
            Ok::<_, anyhow::Error>(json!(BODY_RESULT))
        });
        orchestrator.execute(call)
    }))
    .await;

    let mut report = SimulationReport::default();
    for result in results {
        match result {
            Ok(Value::String(s)) if s == BODY_RESULT => report.ran += 1,
            Ok(fallback) => *report.fallbacks.entry(fallback.to_string()).or_default() += 1,
            Err(error) => report.errors.push(format!("{:#}", error)),
        }
    }
    Ok(report)
}

fn find_operation(manifest: &AdmissionManifest, operation: &str) -> Result<OperationSignature> {
    let mut matches = manifest
        .signatures()
        .into_iter()
        .filter(|signature| signature.canonical_id() == operation);

    let signature = matches.next().ok_or_else(|| {
        let known: Vec<String> = manifest.signatures().iter().map(|s| s.canonical_id()).collect();
        anyhow!(
            "Operation '{}' not found in manifest (known: {})",
            operation,
            known.join(", ")
        )
    })?;
    if matches.next().is_some() {
        bail!("Operation '{}' is overloaded in the manifest", operation);
    }
    Ok(signature)
}

/// Order `name=value` pairs by the operation's declared parameters.
///
/// Parameters without a value are passed as `null`.
fn build_args(signature: &OperationSignature, raw: &[String]) -> Result<Vec<Value>> {
    let mut args = vec![Value::Null; signature.parameters.len()];
    for pair in raw {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Argument '{}' is not in name=value form", pair))?;
        let position = signature
            .position_of(name)
            .ok_or_else(|| anyhow!("{} has no parameter named '{}'", signature, name))?;
        args[position] = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    }
    Ok(args)
}
