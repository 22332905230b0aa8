// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Granted Guards
//!
//! [`GrantedGuards`] owns everything needed to release the guards a call was
//! admitted by. Releases normally run on the caller's task through
//! [`GrantedGuards::release_all`]. When the call future is dropped before that
//! (a caller-side timeout, `select!`, an aborted task) or the body panics,
//! `Drop` hands the outstanding releases to the tokio runtime instead.
//!
//! Each grant is taken out of the set before its release starts, so no guard
//! is released twice.

use std::collections::VecDeque;
use std::sync::Arc;
use tracing::warn;

use crate::application::metadata::ResourceMetadata;
use crate::domain::config::ReleaseOrder;

/// One granted guard: its metadata and the key it was admitted under.
pub struct Grant {
    metadata: Arc<ResourceMetadata>,
    key: String,
}

impl Grant {
    pub fn new(metadata: Arc<ResourceMetadata>, key: impl Into<String>) -> Self {
        Self {
            metadata,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the guard. Failures are logged and swallowed.
    pub async fn release(&self) {
        let guard = self.metadata.guard();
        if let Err(error) = guard
            .release(&self.key, self.metadata.limiter_parameters())
            .await
        {
            warn!(
                "Releasing guard '{}' for key '{}' failed: {}",
                guard.name(),
                self.key,
                error
            );
            metrics::counter!(
                "turnstile_release_failures_total",
                "guard" => guard.name().to_string()
            )
            .increment(1);
        }
    }
}

pub struct GrantedGuards {
    grants: VecDeque<Grant>,
    order: ReleaseOrder,
}

impl GrantedGuards {
    pub fn new(order: ReleaseOrder) -> Self {
        Self {
            grants: VecDeque::new(),
            order,
        }
    }

    pub fn push(&mut self, grant: Grant) {
        self.grants.push_back(grant);
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    fn take_next(&mut self) -> Option<Grant> {
        match self.order {
            ReleaseOrder::Forward => self.grants.pop_front(),
            ReleaseOrder::Reverse => self.grants.pop_back(),
        }
    }

    /// Release every outstanding grant in the configured order.
    pub async fn release_all(&mut self) {
        while let Some(grant) = self.take_next() {
            grant.release().await;
        }
    }
}

impl Drop for GrantedGuards {
    fn drop(&mut self) {
        if self.grants.is_empty() {
            return;
        }

        let mut pending = GrantedGuards {
            grants: std::mem::take(&mut self.grants),
            order: self.order,
        };
        warn!(
            "Call ended with {} guard(s) still held, releasing them in the background",
            pending.len()
        );
        metrics::counter!("turnstile_deferred_releases_total").increment(pending.len() as u64);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    pending.release_all().await;
                });
            }
            Err(_) => futures::executor::block_on(pending.release_all()),
        }
    }
}

impl std::fmt::Debug for GrantedGuards {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantedGuards")
            .field("keys", &self.grants.iter().map(Grant::key).collect::<Vec<_>>())
            .field("order", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::metadata::MetadataCache;
    use crate::domain::descriptor::{DescriptorHandle, ResourceDescriptor};
    use crate::domain::guard::{Guard, GuardParams};
    use crate::domain::operation::OperationSignature;
    use crate::infrastructure::guards::MutexGuard;
    use crate::infrastructure::registry::ComponentRegistry;

    fn mutex_grants(keys: &[&str]) -> (Arc<MutexGuard>, Vec<Grant>) {
        let mutex = Arc::new(MutexGuard::new());
        let mut registry = ComponentRegistry::with_builtins();
        registry.register_guard("lock", Arc::clone(&mutex) as _);

        let cache = MetadataCache::new(Arc::new(registry));
        let signature = OperationSignature::new("Inventory", "reserve");
        let handle = DescriptorHandle::new(ResourceDescriptor::new("lock"));
        let metadata = cache.get_metadata(&handle, &signature).unwrap();

        let grants = keys
            .iter()
            .map(|key| Grant::new(Arc::clone(&metadata), *key))
            .collect();
        (mutex, grants)
    }

    #[tokio::test]
    async fn test_release_all_empties_the_set() {
        let (mutex, grants) = mutex_grants(&["sku:1", "sku:2"]);
        let mut granted = GrantedGuards::new(ReleaseOrder::Reverse);
        for grant in grants {
            assert!(mutex.admit(grant.key(), &GuardParams::new()).await.unwrap());
            granted.push(grant);
        }

        granted.release_all().await;

        assert!(granted.is_empty());
        assert!(!mutex.is_held("sku:1"));
        assert!(!mutex.is_held("sku:2"));
    }

    #[tokio::test]
    async fn test_drop_releases_outstanding_grants() {
        let (mutex, grants) = mutex_grants(&["sku:9"]);
        let mut granted = GrantedGuards::new(ReleaseOrder::Forward);
        for grant in grants {
            assert!(mutex.admit(grant.key(), &GuardParams::new()).await.unwrap());
            granted.push(grant);
        }

        drop(granted);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert!(!mutex.is_held("sku:9"));
    }

    #[test]
    fn test_drop_outside_runtime_releases_inline() {
        let (mutex, grants) = mutex_grants(&["sku:3"]);
        let mut granted = GrantedGuards::new(ReleaseOrder::Forward);
        for grant in grants {
            assert!(futures::executor::block_on(mutex.admit(grant.key(), &GuardParams::new())).unwrap());
            granted.push(grant);
        }

        drop(granted);

        assert!(!mutex.is_held("sku:3"));
    }
}
