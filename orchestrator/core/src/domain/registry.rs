// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Component Resolution
//!
//! Name-based lookup of the plugins a descriptor refers to. Resolution failures
//! are configuration errors: they surface when metadata is first built (or at
//! startup via `Orchestrator::preload`), never as per-call denials.
//!
//! The in-memory implementation is
//! [`crate::infrastructure::registry::ComponentRegistry`].

use std::fmt;
use std::sync::Arc;

use crate::domain::error_handler::ErrorHandler;
use crate::domain::fallback::FallbackResolver;
use crate::domain::guard::Guard;
use crate::domain::injector::ArgumentInjector;
use crate::domain::operation::OperationSignature;

/// Name used when a descriptor leaves a fallback or error handler unset
pub const DEFAULT_COMPONENT: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Guard,
    ErrorHandler,
    Fallback,
    Injector,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ComponentKind::Guard => "guard",
            ComponentKind::ErrorHandler => "error handler",
            ComponentKind::Fallback => "fallback",
            ComponentKind::Injector => "argument injector",
        };
        f.write_str(label)
    }
}

pub trait ComponentResolver: Send + Sync {
    fn guard(&self, name: &str) -> Result<Arc<dyn Guard>, ComponentResolutionError>;

    fn error_handler(&self, name: &str) -> Result<Arc<dyn ErrorHandler>, ComponentResolutionError>;

    /// Resolve a fallback for `signature`. An owner-local fallback with a
    /// matching parameter-type list takes precedence over a global one.
    fn fallback(
        &self,
        name: &str,
        signature: &OperationSignature,
    ) -> Result<Arc<dyn FallbackResolver>, ComponentResolutionError>;

    fn injector(&self, name: &str) -> Result<Arc<dyn ArgumentInjector>, ComponentResolutionError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ComponentResolutionError {
    #[error("No {kind} registered under name '{name}'")]
    NotFound { kind: ComponentKind, name: String },

    #[error("Descriptor for {operation} has an empty guard name")]
    EmptyGuardName { operation: String },

    #[error("Guard '{guard}' requires parameter '{parameter}' which the descriptor for {operation} does not define")]
    MissingParameter {
        guard: String,
        parameter: String,
        operation: String,
    },
}

/// Effective registry name for an optional component
pub fn component_name(name: &str) -> &str {
    if name.trim().is_empty() {
        DEFAULT_COMPONENT
    } else {
        name
    }
}
