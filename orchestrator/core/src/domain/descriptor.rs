// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Resource Descriptors
//!
//! A [`ResourceDescriptor`] is the declarative configuration for one guard
//! attached to one operation. Descriptors are shared through a
//! [`DescriptorHandle`], a versioned configuration object:
//!
//! - the handle's [`DescriptorId`] is the descriptor's *identity*. Two handles
//!   with identical content are still distinct cache entries.
//! - every mutation through [`DescriptorHandle::update`] bumps the version.
//!   Resolved metadata records the version it was built from and is rebuilt
//!   when the handle reports a newer one.
//!
//! Changes made by replacing the handle itself (rather than going through the
//! mutation API) are invisible to metadata already cached under the old
//! handle's id.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::guard::GuardParams;
use crate::domain::operation::OperationSignature;

/// Reference identity of a descriptor handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DescriptorId(pub Uuid);

impl DescriptorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DescriptorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static configuration for one guard attached to one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Registry name of the guard
    #[serde(rename = "guard")]
    pub guard_name: String,

    /// Handlebars key template. Empty means the canonical operation id.
    #[serde(rename = "key", default)]
    pub key_expression: String,

    /// Registry name of the fallback. Empty means `"default"`.
    #[serde(rename = "fallback", default)]
    pub fallback_name: String,

    /// Registry name of the error handler. Empty means `"default"`.
    #[serde(rename = "error_handler", default)]
    pub error_handler_name: String,

    /// Registry names of argument injectors, applied in order
    #[serde(rename = "injectors", default)]
    pub injector_names: Vec<String>,

    /// Guard-specific static parameters (e.g. `rate`, `capacity`)
    #[serde(rename = "params", default)]
    pub static_params: GuardParams,
}

impl ResourceDescriptor {
    pub fn new(guard_name: impl Into<String>) -> Self {
        Self {
            guard_name: guard_name.into(),
            key_expression: String::new(),
            fallback_name: String::new(),
            error_handler_name: String::new(),
            injector_names: Vec::new(),
            static_params: BTreeMap::new(),
        }
    }

    pub fn key(mut self, expression: impl Into<String>) -> Self {
        self.key_expression = expression.into();
        self
    }

    pub fn fallback(mut self, name: impl Into<String>) -> Self {
        self.fallback_name = name.into();
        self
    }

    pub fn error_handler(mut self, name: impl Into<String>) -> Self {
        self.error_handler_name = name.into();
        self
    }

    pub fn injector(mut self, name: impl Into<String>) -> Self {
        self.injector_names.push(name.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.static_params.insert(name.into(), value.into());
        self
    }

    /// Injector names as an ordered set: first occurrence wins.
    pub fn ordered_injectors(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.injector_names
            .iter()
            .map(String::as_str)
            .filter(|name| seen.insert(*name))
            .collect()
    }
}

/// A descriptor together with the version it was read at.
#[derive(Debug, Clone)]
pub struct VersionedDescriptor {
    pub version: u64,
    pub descriptor: Arc<ResourceDescriptor>,
}

/// Shared, observable holder of a [`ResourceDescriptor`].
#[derive(Debug)]
pub struct DescriptorHandle {
    id: DescriptorId,
    state: RwLock<VersionedDescriptor>,
}

impl DescriptorHandle {
    pub fn new(descriptor: ResourceDescriptor) -> Arc<Self> {
        Arc::new(Self {
            id: DescriptorId::new(),
            state: RwLock::new(VersionedDescriptor {
                version: 1,
                descriptor: Arc::new(descriptor),
            }),
        })
    }

    pub fn id(&self) -> DescriptorId {
        self.id
    }

    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Consistent (version, descriptor) pair
    pub fn snapshot(&self) -> VersionedDescriptor {
        self.state.read().clone()
    }

    /// Mutate the descriptor in place and bump the version.
    ///
    /// Returns the new version.
    pub fn update<F>(&self, mutate: F) -> u64
    where
        F: FnOnce(&mut ResourceDescriptor),
    {
        let mut state = self.state.write();
        let mut next = (*state.descriptor).clone();
        mutate(&mut next);
        state.descriptor = Arc::new(next);
        state.version += 1;
        debug!("Descriptor {} updated to version {}", self.id, state.version);
        state.version
    }

    /// Replace the whole descriptor, bumping the version
    pub fn replace(&self, descriptor: ResourceDescriptor) -> u64 {
        self.update(move |current| *current = descriptor)
    }
}

/// Source of the descriptors attached to an operation.
///
/// The returned order is the admission order.
pub trait DescriptorSource: Send + Sync {
    fn descriptors(&self, signature: &OperationSignature) -> Vec<Arc<DescriptorHandle>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_bumps_version_and_keeps_identity() {
        let handle = DescriptorHandle::new(ResourceDescriptor::new("rate-limit").param("rate", 5));
        let id = handle.id();
        assert_eq!(handle.version(), 1);

        let version = handle.update(|d| {
            d.static_params.insert("rate".to_string(), Value::from(10));
        });

        assert_eq!(version, 2);
        assert_eq!(handle.id(), id);
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.version, 2);
        assert_eq!(snapshot.descriptor.static_params["rate"], Value::from(10));
    }

    #[test]
    fn test_identical_content_distinct_identity() {
        let a = DescriptorHandle::new(ResourceDescriptor::new("mutex"));
        let b = DescriptorHandle::new(ResourceDescriptor::new("mutex"));

        assert_eq!(*a.snapshot().descriptor, *b.snapshot().descriptor);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_ordered_injectors_deduplicates() {
        let descriptor = ResourceDescriptor::new("mutex")
            .injector("tenant")
            .injector("region")
            .injector("tenant");

        assert_eq!(descriptor.ordered_injectors(), vec!["tenant", "region"]);
    }

    #[test]
    fn test_yaml_field_names() {
        let yaml = r#"
guard: rate-limit
key: "user:{{args.user_id}}"
fallback: busy
params:
  rate: 10
  capacity: 1
"#;
        let descriptor: ResourceDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(descriptor.guard_name, "rate-limit");
        assert_eq!(descriptor.key_expression, "user:{{args.user_id}}");
        assert_eq!(descriptor.fallback_name, "busy");
        assert!(descriptor.error_handler_name.is_empty());
        assert_eq!(descriptor.static_params["capacity"], Value::from(1));
    }
}
