// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Exclusive per-key lock. Admission takes the lock if nobody holds it;
// release frees it.

use async_trait::async_trait;
use dashmap::DashSet;
use tracing::warn;

use crate::domain::guard::{Guard, GuardError, GuardParams};

pub struct MutexGuard {
    held: DashSet<String>,
}

impl MutexGuard {
    pub fn new() -> Self {
        Self { held: DashSet::new() }
    }

    /// Number of keys currently locked
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains(key)
    }
}

impl Default for MutexGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Guard for MutexGuard {
    fn name(&self) -> &str {
        "mutex"
    }

    async fn admit(&self, key: &str, _params: &GuardParams) -> Result<bool, GuardError> {
        Ok(self.held.insert(key.to_string()))
    }

    async fn release(&self, key: &str, _params: &GuardParams) -> Result<(), GuardError> {
        if self.held.remove(key).is_none() {
            warn!("Released mutex key '{}' that was not held", key);
        }
        Ok(())
    }
}
