// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Resource Metadata & Metadata Cache
//!
//! [`ResourceMetadata`] is a descriptor resolved against one operation
//! signature: concrete guard, error handler, fallback and injector instances
//! plus the flattened guard parameters. Building it goes through the
//! component registry, so it is memoized in [`MetadataCache`].
//!
//! ## Cache semantics
//!
//! - key: `(descriptor identity, operation signature)`
//! - each entry remembers the descriptor version it was resolved from. When
//!   the handle reports a different version the entry is rebuilt and replaced
//!   in place.
//! - concurrent misses may resolve the same entry twice. Entries are stored
//!   fully built behind an `Arc`, and a store never replaces a newer version
//!   with an older one, so the cache converges to one entry per key.
//! - resolution errors are not cached; the next call retries them.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::domain::descriptor::{DescriptorHandle, DescriptorId, ResourceDescriptor, VersionedDescriptor};
use crate::domain::error_handler::ErrorHandler;
use crate::domain::fallback::FallbackResolver;
use crate::domain::guard::{Guard, GuardParams};
use crate::domain::injector::{merge_injected, ArgumentInjector, InjectedArgs};
use crate::domain::operation::OperationSignature;
use crate::domain::registry::{component_name, ComponentResolutionError, ComponentResolver};

static EMPTY_INJECTED: LazyLock<Arc<InjectedArgs>> = LazyLock::new(|| Arc::new(InjectedArgs::new()));

/// A descriptor resolved into live components for one operation.
pub struct ResourceMetadata {
    version: u64,
    descriptor: Arc<ResourceDescriptor>,
    guard: Arc<dyn Guard>,
    error_handler: Arc<dyn ErrorHandler>,
    fallback: Arc<dyn FallbackResolver>,
    injectors: Vec<Arc<dyn ArgumentInjector>>,
    limiter_parameters: GuardParams,
}

impl ResourceMetadata {
    /// Resolve every named component of `versioned` through `resolver`.
    pub fn resolve(
        versioned: &VersionedDescriptor,
        signature: &OperationSignature,
        resolver: &dyn ComponentResolver,
    ) -> Result<Self, ComponentResolutionError> {
        let descriptor = &versioned.descriptor;

        if descriptor.guard_name.trim().is_empty() {
            return Err(ComponentResolutionError::EmptyGuardName {
                operation: signature.canonical_id(),
            });
        }

        let guard = resolver.guard(&descriptor.guard_name)?;
        let error_handler = resolver.error_handler(component_name(&descriptor.error_handler_name))?;
        let fallback = resolver.fallback(component_name(&descriptor.fallback_name), signature)?;
        let injectors = descriptor
            .ordered_injectors()
            .into_iter()
            .map(|name| resolver.injector(name))
            .collect::<Result<Vec<_>, _>>()?;

        let limiter_parameters = Self::extract_parameters(descriptor, guard.as_ref(), signature)?;

        debug!(
            "Resolved metadata for {} (guard '{}', version {})",
            signature.canonical_id(),
            descriptor.guard_name,
            versioned.version
        );

        Ok(Self {
            version: versioned.version,
            descriptor: Arc::clone(descriptor),
            guard,
            error_handler,
            fallback,
            injectors,
            limiter_parameters,
        })
    }

    fn extract_parameters(
        descriptor: &ResourceDescriptor,
        guard: &dyn Guard,
        signature: &OperationSignature,
    ) -> Result<GuardParams, ComponentResolutionError> {
        for required in guard.required_parameters() {
            let defined = descriptor
                .static_params
                .get(*required)
                .is_some_and(|value| !value.is_null());
            if !defined {
                return Err(ComponentResolutionError::MissingParameter {
                    guard: descriptor.guard_name.clone(),
                    parameter: (*required).to_string(),
                    operation: signature.canonical_id(),
                });
            }
        }
        Ok(descriptor.static_params.clone())
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn descriptor(&self) -> &Arc<ResourceDescriptor> {
        &self.descriptor
    }

    pub fn guard(&self) -> &Arc<dyn Guard> {
        &self.guard
    }

    pub fn error_handler(&self) -> &Arc<dyn ErrorHandler> {
        &self.error_handler
    }

    pub fn fallback(&self) -> &Arc<dyn FallbackResolver> {
        &self.fallback
    }

    pub fn injector_count(&self) -> usize {
        self.injectors.len()
    }

    pub fn limiter_parameters(&self) -> &GuardParams {
        &self.limiter_parameters
    }

    /// Run the injectors over `args`.
    ///
    /// Without injectors every call shares one empty map.
    pub fn inject(&self, args: &[Value]) -> Arc<InjectedArgs> {
        if self.injectors.is_empty() {
            return Arc::clone(&EMPTY_INJECTED);
        }
        Arc::new(merge_injected(self.injectors.iter().map(|i| i.as_ref()), args))
    }
}

impl std::fmt::Debug for ResourceMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceMetadata")
            .field("version", &self.version)
            .field("guard", &self.guard.name())
            .field("injectors", &self.injectors.len())
            .field("limiter_parameters", &self.limiter_parameters)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MetadataKey {
    descriptor: DescriptorId,
    signature: OperationSignature,
}

/// Process-lifetime memo of resolved metadata.
pub struct MetadataCache {
    entries: DashMap<MetadataKey, Arc<ResourceMetadata>>,
    resolver: Arc<dyn ComponentResolver>,
}

impl MetadataCache {
    pub fn new(resolver: Arc<dyn ComponentResolver>) -> Self {
        Self {
            entries: DashMap::new(),
            resolver,
        }
    }

    /// Cached metadata for `handle` on `signature`, resolving on miss or when
    /// the descriptor changed since the entry was built.
    pub fn get_metadata(
        &self,
        handle: &DescriptorHandle,
        signature: &OperationSignature,
    ) -> Result<Arc<ResourceMetadata>, ComponentResolutionError> {
        let snapshot = handle.snapshot();
        let key = MetadataKey {
            descriptor: handle.id(),
            signature: signature.clone(),
        };

        if let Some(entry) = self.entries.get(&key) {
            if entry.version() == snapshot.version {
                return Ok(Arc::clone(entry.value()));
            }
            debug!(
                "Descriptor {} moved from version {} to {}, re-resolving",
                handle.id(),
                entry.version(),
                snapshot.version
            );
        }

        // Resolve outside the shard lock
        let resolved = Arc::new(ResourceMetadata::resolve(&snapshot, signature, self.resolver.as_ref())?);

        let stored = match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().version() < resolved.version() {
                    occupied.insert(Arc::clone(&resolved));
                    resolved
                } else {
                    Arc::clone(occupied.get())
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&resolved));
                resolved
            }
        };

        Ok(stored)
    }

    /// Drop every entry built from `descriptor`
    pub fn invalidate(&self, descriptor: DescriptorId) {
        self.entries.retain(|key, _| key.descriptor != descriptor);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::registry::ComponentKind;
    use crate::infrastructure::registry::ComponentRegistry;
    use serde_json::json;

    fn signature() -> OperationSignature {
        OperationSignature::new("Inventory", "reserve").with_parameter("sku", "string")
    }

    fn cache() -> MetadataCache {
        MetadataCache::new(Arc::new(ComponentRegistry::with_builtins()))
    }

    #[test]
    fn test_cache_hit_returns_same_instance() {
        let cache = cache();
        let handle = DescriptorHandle::new(ResourceDescriptor::new("mutex"));

        let first = cache.get_metadata(&handle, &signature()).unwrap();
        let second = cache.get_metadata(&handle, &signature()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_descriptor_update_rebuilds_in_place() {
        let cache = cache();
        let handle = DescriptorHandle::new(ResourceDescriptor::new("rate-limit").param("rate", 5));

        let before = cache.get_metadata(&handle, &signature()).unwrap();
        handle.update(|d| {
            d.static_params.insert("rate".to_string(), json!(50));
        });
        let after = cache.get_metadata(&handle, &signature()).unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.version(), 2);
        assert_eq!(after.limiter_parameters()["rate"], json!(50));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_handles_are_distinct_entries() {
        let cache = cache();
        let a = DescriptorHandle::new(ResourceDescriptor::new("mutex"));
        let b = DescriptorHandle::new(ResourceDescriptor::new("mutex"));

        cache.get_metadata(&a, &signature()).unwrap();
        cache.get_metadata(&b, &signature()).unwrap();

        assert_eq!(cache.len(), 2);
        cache.invalidate(a.id());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unknown_guard_is_resolution_error() {
        let cache = cache();
        let handle = DescriptorHandle::new(ResourceDescriptor::new("no-such-guard"));

        let err = cache.get_metadata(&handle, &signature()).unwrap_err();
        assert!(matches!(
            err,
            ComponentResolutionError::NotFound { kind: ComponentKind::Guard, .. }
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_missing_required_parameter() {
        let cache = cache();
        let handle = DescriptorHandle::new(ResourceDescriptor::new("concurrency"));

        let err = cache.get_metadata(&handle, &signature()).unwrap_err();
        assert!(matches!(err, ComponentResolutionError::MissingParameter { ref parameter, .. } if parameter == "max_concurrent"));
    }

    #[test]
    fn test_empty_injector_list_shares_empty_map() {
        let cache = cache();
        let handle = DescriptorHandle::new(ResourceDescriptor::new("mutex"));
        let metadata = cache.get_metadata(&handle, &signature()).unwrap();

        let a = metadata.inject(&[json!("sku-1")]);
        let b = metadata.inject(&[json!("sku-2")]);

        assert!(a.is_empty());
        assert!(Arc::ptr_eq(&a, &b));
    }
}
