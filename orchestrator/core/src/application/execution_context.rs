// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Execution Context
//!
//! One guard's live state for one call: the resolved metadata, the merged
//! injected arguments, the computed key and, after a guard failure, the
//! captured error and fallback result. Created fresh per call and dropped when
//! the call completes; a granted context hands its release over as a
//! [`Grant`].

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::application::metadata::ResourceMetadata;
use crate::application::release::Grant;
use crate::domain::call::CallSite;
use crate::domain::error_handler::AdmissionAttempt;
use crate::domain::fallback::{FallbackError, FallbackRequest};
use crate::domain::guard::GuardError;
use crate::domain::injector::InjectedArgs;
use crate::domain::key::{KeyContext, KeyEvaluationError, KeyEvaluator};

/// Result of one admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The guard admitted the call
    Granted,
    /// The guard failed and its error handler chose to let the call through
    Bypassed,
    /// The guard denied the call
    Denied,
    /// The guard failed and its error handler chose to deny
    DeniedOnError,
}

impl Admission {
    /// Granted and bypassed contexts both count as held and get released.
    pub fn is_granted(self) -> bool {
        matches!(self, Admission::Granted | Admission::Bypassed)
    }

    fn label(self) -> &'static str {
        match self {
            Admission::Granted => "granted",
            Admission::Bypassed => "bypassed",
            Admission::Denied => "denied",
            Admission::DeniedOnError => "denied_on_error",
        }
    }
}

pub struct ExecutionContext<'a> {
    metadata: Arc<ResourceMetadata>,
    site: &'a CallSite,
    injected: Arc<InjectedArgs>,
    key: String,
    guard_error: Option<GuardError>,
    fallback_result: Option<Value>,
}

impl<'a> ExecutionContext<'a> {
    /// Inject arguments, then evaluate the key.
    pub fn build(
        metadata: Arc<ResourceMetadata>,
        site: &'a CallSite,
        evaluator: &dyn KeyEvaluator,
    ) -> Result<Self, KeyEvaluationError> {
        let injected = metadata.inject(&site.args);
        let key = evaluator.evaluate(
            &metadata.descriptor().key_expression,
            &KeyContext {
                guard_name: metadata.guard().name(),
                signature: &site.signature,
                target: site.target.as_ref(),
                args: &site.args,
                injected: &injected,
            },
        )?;

        Ok(Self {
            metadata,
            site,
            injected,
            key,
            guard_error: None,
            fallback_result: None,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn injected(&self) -> &InjectedArgs {
        &self.injected
    }

    pub fn metadata(&self) -> &Arc<ResourceMetadata> {
        &self.metadata
    }

    pub fn guard_name(&self) -> &str {
        self.metadata.guard().name()
    }

    /// Guard failure captured by the last admission attempt
    pub fn guard_error(&self) -> Option<&GuardError> {
        self.guard_error.as_ref()
    }

    pub fn fallback_result(&self) -> Option<&Value> {
        self.fallback_result.as_ref()
    }

    fn attempt(&self) -> AdmissionAttempt<'_> {
        AdmissionAttempt {
            guard_name: self.guard_name(),
            key: &self.key,
            params: self.metadata.limiter_parameters(),
            signature: &self.site.signature,
            args: &self.site.args,
            target: self.site.target.as_ref(),
        }
    }

    /// Ask the guard for admission, routing guard failures through the error
    /// handler.
    pub async fn try_admit(&mut self, timeout: Option<Duration>) -> Admission {
        let guard = Arc::clone(self.metadata.guard());
        let params = self.metadata.limiter_parameters();

        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, guard.admit(&self.key, params)).await {
                Ok(result) => result,
                Err(_) => Err(GuardError::Timeout(limit)),
            },
            None => guard.admit(&self.key, params).await,
        };

        let admission = match outcome {
            Ok(true) => Admission::Granted,
            Ok(false) => Admission::Denied,
            Err(error) => {
                warn!(
                    "Guard '{}' failed for key '{}': {}",
                    guard.name(),
                    self.key,
                    error
                );
                let decision = self
                    .metadata
                    .error_handler()
                    .resolve(&error, &self.attempt())
                    .await;
                self.guard_error = Some(error);
                match decision {
                    Ok(true) => Admission::Bypassed,
                    Ok(false) => Admission::DeniedOnError,
                    Err(handler_error) => {
                        warn!(
                            "Error handler for guard '{}' failed, denying: {}",
                            guard.name(),
                            handler_error
                        );
                        Admission::DeniedOnError
                    }
                }
            }
        };

        debug!(
            "Guard '{}' on key '{}': {}",
            guard.name(),
            self.key,
            admission.label()
        );
        metrics::counter!(
            "turnstile_admission_total",
            "guard" => guard.name().to_string(),
            "outcome" => admission.label()
        )
        .increment(1);

        admission
    }

    /// Hand over what is needed to release this context's guard later.
    pub fn grant(&self) -> Grant {
        Grant::new(Arc::clone(&self.metadata), self.key.clone())
    }

    /// Compute (and remember) the fallback result for a denial on this context.
    pub async fn fallback(&mut self) -> Result<Value, FallbackError> {
        let request = FallbackRequest {
            signature: &self.site.signature,
            args: &self.site.args,
            descriptor: self.metadata.descriptor(),
            target: self.site.target.as_ref(),
            key: &self.key,
            guard_error: self.guard_error.as_ref(),
        };
        let value = self.metadata.fallback().resolve(&request).await?;
        self.fallback_result = Some(value.clone());
        Ok(value)
    }
}

impl std::fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("guard", &self.guard_name())
            .field("key", &self.key)
            .field("injected", &self.injected)
            .field("guard_error", &self.guard_error)
            .finish()
    }
}
