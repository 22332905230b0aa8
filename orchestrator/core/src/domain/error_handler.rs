// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Error Handler Plugin Interface
//!
//! Decides whether a failing guard counts as admission granted (fail open) or
//! denied (fail closed).

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::guard::{GuardError, GuardParams};
use crate::domain::operation::OperationSignature;

/// Read-only view of the admission attempt that failed
#[derive(Debug, Clone, Copy)]
pub struct AdmissionAttempt<'a> {
    pub guard_name: &'a str,
    pub key: &'a str,
    pub params: &'a GuardParams,
    pub signature: &'a OperationSignature,
    pub args: &'a [Value],
    pub target: Option<&'a Value>,
}

#[async_trait]
pub trait ErrorHandler: Send + Sync {
    /// `Ok(true)` bypasses the failed guard, `Ok(false)` denies the call.
    ///
    /// An `Err` is treated as a denial.
    async fn resolve(
        &self,
        error: &GuardError,
        attempt: &AdmissionAttempt<'_>,
    ) -> Result<bool, GuardError>;
}
