// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Bounded in-flight calls per key.
//
// Counts admitted-but-unreleased calls. A key's counter is dropped once it
// returns to zero, so idle keys hold no memory.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::warn;

use crate::domain::guard::{positive_u32, Guard, GuardError, GuardParams};

const REQUIRED: &[&str] = &["max_concurrent"];

pub struct ConcurrencyGuard {
    in_flight: DashMap<String, u32>,
}

impl ConcurrencyGuard {
    pub fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
        }
    }

    pub fn in_flight(&self, key: &str) -> u32 {
        self.in_flight.get(key).map(|count| *count).unwrap_or(0)
    }
}

impl Default for ConcurrencyGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Guard for ConcurrencyGuard {
    fn name(&self) -> &str {
        "concurrency"
    }

    fn required_parameters(&self) -> &[&'static str] {
        REQUIRED
    }

    async fn admit(&self, key: &str, params: &GuardParams) -> Result<bool, GuardError> {
        let limit = positive_u32(params, "max_concurrent")?;
        let mut count = self.in_flight.entry(key.to_string()).or_insert(0);
        if *count >= limit {
            return Ok(false);
        }
        *count += 1;
        Ok(true)
    }

    async fn release(&self, key: &str, _params: &GuardParams) -> Result<(), GuardError> {
        match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if *occupied.get() <= 1 {
                    occupied.remove();
                } else {
                    *occupied.get_mut() -= 1;
                }
            }
            Entry::Vacant(_) => {
                warn!("Released concurrency key '{}' with nothing in flight", key);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(max: u32) -> GuardParams {
        let mut params = GuardParams::new();
        params.insert("max_concurrent".to_string(), json!(max));
        params
    }

    #[tokio::test]
    async fn test_limit_and_release() {
        let guard = ConcurrencyGuard::new();
        let params = params(2);

        assert!(guard.admit("db", &params).await.unwrap());
        assert!(guard.admit("db", &params).await.unwrap());
        assert!(!guard.admit("db", &params).await.unwrap());
        assert_eq!(guard.in_flight("db"), 2);

        guard.release("db", &params).await.unwrap();
        assert!(guard.admit("db", &params).await.unwrap());

        guard.release("db", &params).await.unwrap();
        guard.release("db", &params).await.unwrap();
        assert_eq!(guard.in_flight("db"), 0);
    }

    #[tokio::test]
    async fn test_missing_limit_is_guard_error() {
        let guard = ConcurrencyGuard::new();
        assert!(guard.admit("db", &GuardParams::new()).await.is_err());
    }
}
