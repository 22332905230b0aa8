// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Built-in error handlers: fail closed (`default`, `deny`) and fail open (`bypass`).

use async_trait::async_trait;
use tracing::warn;

use crate::domain::error_handler::{AdmissionAttempt, ErrorHandler};
use crate::domain::guard::GuardError;

/// Treats a failing guard as a denial.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailClosedHandler;

#[async_trait]
impl ErrorHandler for FailClosedHandler {
    async fn resolve(&self, _error: &GuardError, _attempt: &AdmissionAttempt<'_>) -> Result<bool, GuardError> {
        Ok(false)
    }
}

/// Lets the call through when its guard fails. The context still counts as
/// granted and is released afterwards.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailOpenHandler;

#[async_trait]
impl ErrorHandler for FailOpenHandler {
    async fn resolve(&self, error: &GuardError, attempt: &AdmissionAttempt<'_>) -> Result<bool, GuardError> {
        warn!(
            "Bypassing failed guard '{}' for {} (key '{}'): {}",
            attempt.guard_name,
            attempt.signature.canonical_id(),
            attempt.key,
            error
        );
        Ok(true)
    }
}
