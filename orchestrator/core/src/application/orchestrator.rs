// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Admission Orchestrator
//!
//! Drives the admission pipeline for one call.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Orchestrator::execute(call)
//!   └─ DescriptorSource::descriptors(signature)       ← empty: run body directly
//!   └─ for each descriptor, in order:
//!         MetadataCache::get_metadata                 ← cached resolution
//!         ExecutionContext::build                     ← injectors, then key
//!   └─ for each context, in order:
//!         ExecutionContext::try_admit                 ← guard, error handler
//!           denied at i → release 1..i-1, return fallback of i
//!   └─ real body
//!   └─ release every granted context (success or error)
//! ```
//!
//! Granted contexts are collected in [`GrantedGuards`]. If the `execute`
//! future is dropped mid-call or the body panics, its `Drop` releases
//! whatever is still held.
//!
//! All contexts are built before any guard is consulted, so a key evaluation
//! or component resolution failure aborts the call without touching a guard.
//!
//! ## Guarantees
//!
//! - The real body runs iff every guard granted admission, directly or through
//!   an error-handler bypass.
//! - Every granted context is released exactly once on every exit path.
//! - A real-body error is returned unchanged after the releases ran.
//!
//! Everything runs on the caller's task. The only spawned work is the
//! release of guards left held by a cancelled or panicked call.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::execution_context::ExecutionContext;
use crate::application::metadata::MetadataCache;
use crate::application::release::GrantedGuards;
use crate::domain::call::Call;
use crate::domain::config::OrchestratorConfig;
use crate::domain::descriptor::DescriptorSource;
use crate::domain::fallback::FallbackError;
use crate::domain::key::{KeyEvaluationError, KeyEvaluator};
use crate::domain::operation::OperationSignature;
use crate::domain::registry::{ComponentResolutionError, ComponentResolver};

/// Failures raised by the pipeline itself.
///
/// Callers choose their own error type `E: From<AdmissionError>`; the real
/// body's errors never pass through this enum.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error(transparent)]
    KeyEvaluation(#[from] KeyEvaluationError),

    #[error(transparent)]
    ComponentResolution(#[from] ComponentResolutionError),

    #[error(transparent)]
    Fallback(#[from] FallbackError),
}

pub struct Orchestrator {
    source: Arc<dyn DescriptorSource>,
    cache: MetadataCache,
    key_evaluator: Arc<dyn KeyEvaluator>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn DescriptorSource>,
        resolver: Arc<dyn ComponentResolver>,
        key_evaluator: Arc<dyn KeyEvaluator>,
    ) -> Self {
        Self {
            source,
            cache: MetadataCache::new(resolver),
            key_evaluator,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn metadata_cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Resolve metadata for every descriptor of `signature`.
    ///
    /// Returns the number of descriptors resolved. Meant for startup so that
    /// configuration errors do not first appear inside a business call.
    pub fn preload(&self, signature: &OperationSignature) -> Result<usize, ComponentResolutionError> {
        let handles = self.source.descriptors(signature);
        for handle in &handles {
            self.cache.get_metadata(handle, signature)?;
        }
        debug!("Preloaded {} descriptor(s) for {}", handles.len(), signature);
        Ok(handles.len())
    }

    /// Run `call` through every guard attached to its operation.
    pub async fn execute<'a, E>(&self, call: Call<'a, E>) -> Result<Value, E>
    where
        E: From<AdmissionError> + Send + 'a,
    {
        let (site, proceed) = call.into_parts();

        let handles = self.source.descriptors(&site.signature);
        if handles.is_empty() {
            return proceed().await;
        }

        let mut contexts = Vec::with_capacity(handles.len());
        for handle in &handles {
            let metadata = self
                .cache
                .get_metadata(handle, &site.signature)
                .map_err(|e| E::from(AdmissionError::from(e)))?;
            let context = ExecutionContext::build(metadata, &site, self.key_evaluator.as_ref())
                .map_err(|e| E::from(AdmissionError::from(e)))?;
            contexts.push(context);
        }

        let timeout = self.config.admit_timeout();
        let mut granted = GrantedGuards::new(self.config.release_order);
        let mut denied_at = None;

        for (index, context) in contexts.iter_mut().enumerate() {
            if context.try_admit(timeout).await.is_granted() {
                granted.push(context.grant());
            } else {
                denied_at = Some(index);
                break;
            }
        }

        if let Some(index) = denied_at {
            info!(
                "Call to {} denied by guard '{}' (key '{}'), returning fallback",
                site.signature.canonical_id(),
                contexts[index].guard_name(),
                contexts[index].key()
            );
            granted.release_all().await;
            return contexts[index]
                .fallback()
                .await
                .map_err(|e| E::from(AdmissionError::from(e)));
        }

        debug!(
            "All {} guard(s) admitted {}",
            contexts.len(),
            site.signature.canonical_id()
        );
        let result = proceed().await;
        granted.release_all().await;
        result
    }
}
