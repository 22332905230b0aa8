// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Fallback Resolver Plugin Interface
//!
//! Produces the substitute result returned to the caller when a guard denies
//! admission. A fallback error propagates to the caller as-is; there is no
//! secondary fallback.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::descriptor::ResourceDescriptor;
use crate::domain::guard::GuardError;
use crate::domain::operation::OperationSignature;

/// Everything a fallback may look at
#[derive(Debug, Clone, Copy)]
pub struct FallbackRequest<'a> {
    pub signature: &'a OperationSignature,
    pub args: &'a [Value],
    /// Descriptor whose guard denied the call
    pub descriptor: &'a ResourceDescriptor,
    pub target: Option<&'a Value>,
    pub key: &'a str,
    /// Guard failure that led to the denial, if the denial came from the error handler
    pub guard_error: Option<&'a GuardError>,
}

impl FallbackRequest<'_> {
    /// Owning type of the denied operation
    pub fn owner(&self) -> &str {
        &self.signature.owner
    }
}

#[async_trait]
pub trait FallbackResolver: Send + Sync {
    async fn resolve(&self, request: &FallbackRequest<'_>) -> Result<Value, FallbackError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FallbackError {
    #[error("Call to {operation} rejected by guard '{guard}'")]
    Rejected { operation: String, guard: String },

    #[error("Fallback failed: {0}")]
    Failed(#[from] anyhow::Error),
}
