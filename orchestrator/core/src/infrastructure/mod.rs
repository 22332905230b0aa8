// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod descriptor_source;
pub mod error_handlers;
pub mod fallbacks;
pub mod guards;
pub mod injectors;
pub mod key_evaluator;
pub mod manifest_parser;
pub mod registry;

pub use descriptor_source::InMemoryDescriptorSource;
pub use key_evaluator::HandlebarsKeyEvaluator;
pub use manifest_parser::{AdmissionManifest, AdmissionManifestParser, ManifestError};
pub use registry::ComponentRegistry;
