// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Key Evaluation
//!
//! Computes the bucket key a guard is consulted with. An empty expression maps
//! every call of the operation to `"<owner>.<operation>"`, so all callers share
//! one bucket regardless of arguments. Integrators wanting per-user or
//! per-tenant limits must set a key expression.

use serde_json::Value;

use crate::domain::injector::InjectedArgs;
use crate::domain::operation::OperationSignature;

/// Values a key expression can reference
#[derive(Debug, Clone, Copy)]
pub struct KeyContext<'a> {
    pub guard_name: &'a str,
    pub signature: &'a OperationSignature,
    pub target: Option<&'a Value>,
    pub args: &'a [Value],
    pub injected: &'a InjectedArgs,
}

pub trait KeyEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str, context: &KeyContext<'_>) -> Result<String, KeyEvaluationError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum KeyEvaluationError {
    #[error("Invalid key expression '{expression}': {reason}")]
    Syntax { expression: String, reason: String },

    #[error("Key expression '{expression}' references '{path}' which is missing or null")]
    Unresolved { expression: String, path: String },

    #[error("Key expression '{expression}' failed to render: {reason}")]
    Render { expression: String, reason: String },

    #[error("Key expression '{expression}' evaluated to an empty key")]
    Empty { expression: String },
}
