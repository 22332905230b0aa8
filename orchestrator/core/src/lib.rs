// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Turnstile Core
//!
//! Admission control for guarded operations: each call is checked against an
//! ordered list of guards before its body runs, and a denied call returns a
//! fallback result instead.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Domain:** plugin contracts and value objects
//! - **Application:** metadata resolution, per-call execution contexts, the orchestrator
//! - **Infrastructure:** registry, Handlebars key evaluator, built-in plugins, manifest parser
//!
//! # Usage
//!
//! ```ignore
//! let source = InMemoryDescriptorSource::new();
//! source.register(&signature, ResourceDescriptor::new("rate-limit").key("user:{{args.user_id}}").param("rate", 10));
//!
//! let orchestrator = Orchestrator::new(
//!     Arc::new(source),
//!     Arc::new(ComponentRegistry::with_builtins()),
//!     Arc::new(HandlebarsKeyEvaluator::new()),
//! );
//! let result = orchestrator
//!     .execute(Call::new(signature, vec![json!("u-42")], || async { place_order().await }))
//!     .await?;
//! ```

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use application::{AdmissionError, Orchestrator};
pub use domain::*;
pub use infrastructure::{AdmissionManifestParser, ComponentRegistry, HandlebarsKeyEvaluator, InMemoryDescriptorSource};
