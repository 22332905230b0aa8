// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Operation Signature Value Object
//!
//! Identifies a guarded operation: the owning type, the operation name and the
//! declared parameter list. Signatures are cache-key components only; they are
//! built once by the interception layer and never mutated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One declared parameter of a guarded operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Declared parameter name, addressable from key expressions as `args.<name>`.
    pub name: String,

    /// Declared parameter type (free-form, e.g. `"string"`, `"u64"`, `"Order"`).
    #[serde(rename = "type", default = "default_type_name")]
    pub type_name: String,
}

fn default_type_name() -> String {
    "any".to_string()
}

/// (owning type, operation, parameter list) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationSignature {
    pub owner: String,
    pub operation: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

impl OperationSignature {
    pub fn new(owner: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            operation: operation.into(),
            parameters: Vec::new(),
        }
    }

    /// Builder-style parameter declaration
    pub fn with_parameter(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.parameters.push(ParameterSpec {
            name: name.into(),
            type_name: type_name.into(),
        });
        self
    }

    /// `"<owner>.<operation>"`.
    ///
    /// This is also the key used when a descriptor has no key expression, which
    /// means every call to the operation shares one bucket regardless of its
    /// arguments.
    pub fn canonical_id(&self) -> String {
        format!("{}.{}", self.owner, self.operation)
    }

    pub fn parameter_types(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.type_name.as_str())
    }

    /// Position of a declared parameter
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }
}

impl fmt::Display for OperationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.owner, self.operation)?;
        for (index, parameter) in self.parameters.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", parameter.name, parameter.type_name)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_id_ignores_parameters() {
        let signature = OperationSignature::new("OrderService", "place_order")
            .with_parameter("user_id", "string");

        assert_eq!(signature.canonical_id(), "OrderService.place_order");
        assert_eq!(signature.position_of("user_id"), Some(0));
        assert_eq!(signature.position_of("missing"), None);
    }

    #[test]
    fn test_display_lists_parameters() {
        let signature = OperationSignature::new("Billing", "charge")
            .with_parameter("account", "string")
            .with_parameter("cents", "u64");

        assert_eq!(signature.to_string(), "Billing.charge(account: string, cents: u64)");
    }
}
