// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Guarded Call
//!
//! A single guarded invocation handed to the orchestrator by the interception
//! layer: the operation signature, the target snapshot, the already-flattened
//! argument list and a one-shot callback that runs the real body.
//!
//! The body's error type `E` is chosen by the caller and travels through the
//! pipeline untouched.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;

use crate::domain::operation::OperationSignature;

/// Boxed future produced by the real body
pub type BodyFuture<'a, E> = BoxFuture<'a, Result<Value, E>>;

/// One-shot callback that runs the real body
pub type Proceed<'a, E> = Box<dyn FnOnce() -> BodyFuture<'a, E> + Send + 'a>;

/// Static part of a call: everything guards, key expressions and fallbacks may
/// observe.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub signature: OperationSignature,
    pub target: Option<Value>,
    pub args: Vec<Value>,
}

pub struct Call<'a, E> {
    site: CallSite,
    proceed: Proceed<'a, E>,
}

impl<'a, E> Call<'a, E> {
    /// Create a call from its signature, positional arguments and real body.
    pub fn new<F, Fut>(signature: OperationSignature, args: Vec<Value>, proceed: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<Value, E>> + Send + 'a,
    {
        Self {
            site: CallSite {
                signature,
                target: None,
                args,
            },
            proceed: Box::new(move || proceed().boxed()),
        }
    }

    /// Attach a snapshot of the target instance
    pub fn with_target(mut self, target: Value) -> Self {
        self.site.target = Some(target);
        self
    }

    pub fn site(&self) -> &CallSite {
        &self.site
    }

    pub fn into_parts(self) -> (CallSite, Proceed<'a, E>) {
        (self.site, self.proceed)
    }
}

impl<E> std::fmt::Debug for Call<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Call").field("site", &self.site).finish_non_exhaustive()
    }
}
