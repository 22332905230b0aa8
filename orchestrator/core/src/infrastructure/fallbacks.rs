// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Built-in fallback resolvers
//
// - NullFallback: returns `null` (registered as `default` and `null`)
// - StaticFallback: returns a fixed value (manifest `spec.fallbacks` entries)
// - RejectFallback: turns the denial into an error (`reject`)
// - FnFallback: adapts a closure, for application-defined fallbacks

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::fallback::{FallbackError, FallbackRequest, FallbackResolver};

#[derive(Debug, Default, Clone, Copy)]
pub struct NullFallback;

#[async_trait]
impl FallbackResolver for NullFallback {
    async fn resolve(&self, _request: &FallbackRequest<'_>) -> Result<Value, FallbackError> {
        Ok(Value::Null)
    }
}

#[derive(Debug, Clone)]
pub struct StaticFallback {
    value: Value,
}

impl StaticFallback {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

#[async_trait]
impl FallbackResolver for StaticFallback {
    async fn resolve(&self, _request: &FallbackRequest<'_>) -> Result<Value, FallbackError> {
        Ok(self.value.clone())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RejectFallback;

#[async_trait]
impl FallbackResolver for RejectFallback {
    async fn resolve(&self, request: &FallbackRequest<'_>) -> Result<Value, FallbackError> {
        Err(FallbackError::Rejected {
            operation: request.signature.canonical_id(),
            guard: request.descriptor.guard_name.clone(),
        })
    }
}

/// Synchronous closure over the fallback request.
pub struct FnFallback<F> {
    resolve: F,
}

impl<F> FnFallback<F>
where
    F: Fn(&FallbackRequest<'_>) -> anyhow::Result<Value> + Send + Sync,
{
    pub fn new(resolve: F) -> Self {
        Self { resolve }
    }
}

#[async_trait]
impl<F> FallbackResolver for FnFallback<F>
where
    F: Fn(&FallbackRequest<'_>) -> anyhow::Result<Value> + Send + Sync,
{
    async fn resolve(&self, request: &FallbackRequest<'_>) -> Result<Value, FallbackError> {
        Ok((self.resolve)(request)?)
    }
}
