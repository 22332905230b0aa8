// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Manifest validation
//!
//! Parses the manifest, registers the built-in components plus the manifest's
//! own fallbacks and resolves every descriptor, so that unknown names and
//! missing guard parameters are reported here rather than on the first call.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use turnstile_core::domain::registry::DEFAULT_COMPONENT;
use turnstile_core::infrastructure::manifest_parser::AdmissionManifest;
use turnstile_core::{AdmissionManifestParser, ComponentRegistry};

#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the admission manifest
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,
}

pub async fn execute(args: ValidateArgs) -> Result<()> {
    println!("Validating {}...", args.manifest.display());

    let manifest = AdmissionManifestParser::parse_file(&args.manifest)
        .with_context(|| format!("Failed to load manifest {:?}", args.manifest))?;
    let resolved = check(&manifest)?;

    print_summary(&manifest);
    println!(
        "{}",
        format!("✓ Manifest is valid ({} descriptor(s) resolved)", resolved).green()
    );
    Ok(())
}

/// Resolve every descriptor of `manifest`, regardless of its `preload` setting.
///
/// Returns the number of descriptors resolved.
pub fn check(manifest: &AdmissionManifest) -> Result<usize> {
    let mut manifest = manifest.clone();
    manifest.spec.orchestrator.preload = true;

    let orchestrator = manifest
        .build_orchestrator(ComponentRegistry::with_builtins())
        .context("Manifest references components that do not resolve")?;

    Ok(orchestrator.metadata_cache().len())
}

fn print_summary(manifest: &AdmissionManifest) {
    println!();
    println!("{} {}", "Manifest:".bold(), manifest.metadata.name);
    println!(
        "  Release order: {:?}",
        manifest.spec.orchestrator.release_order
    );
    if let Some(timeout) = manifest.spec.orchestrator.admit_timeout() {
        println!("  Admit timeout: {:?}", timeout);
    }
    if !manifest.spec.fallbacks.is_empty() {
        let names: Vec<&str> = manifest.spec.fallbacks.keys().map(String::as_str).collect();
        println!("  Static fallbacks: {}", names.join(", "));
    }
    println!();

    for op in &manifest.spec.operations {
        println!("{}", op.signature().to_string().bold());
        if op.resources.is_empty() {
            println!("  {}", "(no guards)".dimmed());
        }
        for (index, resource) in op.resources.iter().enumerate() {
            let key = if resource.key_expression.is_empty() {
                format!("{} {}", op.signature().canonical_id(), "(default)".dimmed())
            } else {
                resource.key_expression.clone()
            };
            println!(
                "  {}. {} key={} fallback={} error_handler={}",
                index + 1,
                resource.guard_name.cyan(),
                key,
                or_default(&resource.fallback_name),
                or_default(&resource.error_handler_name)
            );
        }
    }
    println!();
}

fn or_default(name: &str) -> &str {
    if name.is_empty() {
        DEFAULT_COMPONENT
    } else {
        name
    }
}
