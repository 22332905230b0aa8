// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Guard (Limiter) Plugin Interface
//!
//! A guard is the admission primitive attached to an operation: a rate limiter,
//! a mutual-exclusion lock, a concurrency cap. Only the external contract lives
//! here; implementations are in `crate::infrastructure::guards`.
//!
//! ## Contract
//!
//! - `admit` returning `Ok(false)` is an ordinary denial.
//! - `admit` returning `Err(_)` is an infrastructural failure. The orchestrator
//!   routes it through the descriptor's [`crate::domain::error_handler::ErrorHandler`].
//! - `release` must succeed when there is nothing to release (e.g. a pure rate
//!   counter has no unwind step). Errors from `release` are logged and dropped.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Flattened static parameters handed to a guard on every call.
pub type GuardParams = BTreeMap<String, Value>;

#[async_trait]
pub trait Guard: Send + Sync {
    /// Diagnostic name
    fn name(&self) -> &str;

    /// Static parameters a descriptor must define for this guard.
    fn required_parameters(&self) -> &[&'static str] {
        &[]
    }

    /// Try to admit a call under `key`.
    async fn admit(&self, key: &str, params: &GuardParams) -> Result<bool, GuardError>;

    /// Undo a previous admission under `key`. No-op when nothing is held.
    async fn release(&self, key: &str, params: &GuardParams) -> Result<(), GuardError>;
}

/// Infrastructural guard failures (distinct from a normal deny)
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Guard backend unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid guard parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Admission timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Read a required positive integer parameter
pub fn positive_u32(params: &GuardParams, name: &str) -> Result<u32, GuardError> {
    let value = params.get(name).ok_or_else(|| GuardError::InvalidParameter {
        name: name.to_string(),
        reason: "missing".to_string(),
    })?;
    parse_positive_u32(name, value)
}

/// Read an optional positive integer parameter, falling back to `default`
pub fn positive_u32_or(params: &GuardParams, name: &str, default: u32) -> Result<u32, GuardError> {
    match params.get(name) {
        Some(value) => parse_positive_u32(name, value),
        None => Ok(default),
    }
}

fn parse_positive_u32(name: &str, value: &Value) -> Result<u32, GuardError> {
    // YAML manifests often quote numbers
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    match parsed {
        Some(n) if n > 0 && n <= u32::MAX as u64 => Ok(n as u32),
        _ => Err(GuardError::InvalidParameter {
            name: name.to_string(),
            reason: format!("expected a positive integer, got {}", value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_u32_accepts_numbers_and_strings() {
        let mut params = GuardParams::new();
        params.insert("rate".to_string(), Value::from(10));
        params.insert("capacity".to_string(), Value::from("3"));

        assert_eq!(positive_u32(&params, "rate").unwrap(), 10);
        assert_eq!(positive_u32(&params, "capacity").unwrap(), 3);
        assert_eq!(positive_u32_or(&params, "burst", 7).unwrap(), 7);
    }

    #[test]
    fn test_positive_u32_rejects_zero_and_garbage() {
        let mut params = GuardParams::new();
        params.insert("zero".to_string(), Value::from(0));
        params.insert("text".to_string(), Value::from("lots"));

        assert!(matches!(
            positive_u32(&params, "zero"),
            Err(GuardError::InvalidParameter { .. })
        ));
        assert!(positive_u32(&params, "text").is_err());
        assert!(positive_u32(&params, "absent").is_err());
    }
}
