// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Token-bucket rate limiting per key, backed by governor.
//
// Every distinct `(rate, capacity)` pair gets its own keyed limiter, so two
// descriptors sharing a key but declaring different limits keep separate
// buckets. A descriptor update that changes the limits simply lands on a
// different limiter. Buckets that have refilled completely carry no state and
// are pruned every `PRUNE_EVERY` admissions.

use async_trait::async_trait;
use dashmap::DashMap;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::domain::guard::{positive_u32, positive_u32_or, Guard, GuardError, GuardParams};

const REQUIRED: &[&str] = &["rate"];

const PRUNE_EVERY: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Limits {
    rate: NonZeroU32,
    capacity: NonZeroU32,
}

impl Limits {
    fn from_params(params: &GuardParams) -> Result<Self, GuardError> {
        let rate = positive_u32(params, "rate")?;
        let capacity = positive_u32_or(params, "capacity", rate)?;
        Ok(Self {
            rate: to_non_zero("rate", rate)?,
            capacity: to_non_zero("capacity", capacity)?,
        })
    }

    fn quota(self) -> Quota {
        Quota::per_second(self.rate).allow_burst(self.capacity)
    }
}

fn to_non_zero(name: &str, value: u32) -> Result<NonZeroU32, GuardError> {
    NonZeroU32::new(value).ok_or_else(|| GuardError::InvalidParameter {
        name: name.to_string(),
        reason: "must be greater than zero".to_string(),
    })
}

pub struct RateLimitGuard {
    limiters: DashMap<Limits, Arc<DefaultKeyedRateLimiter<String>>>,
    admissions: AtomicU64,
}

impl RateLimitGuard {
    pub fn new() -> Self {
        Self {
            limiters: DashMap::new(),
            admissions: AtomicU64::new(0),
        }
    }

    fn limiter_for(&self, limits: Limits) -> Arc<DefaultKeyedRateLimiter<String>> {
        if let Some(limiter) = self.limiters.get(&limits) {
            return Arc::clone(limiter.value());
        }
        let limiter = self
            .limiters
            .entry(limits)
            .or_insert_with(|| Arc::new(RateLimiter::keyed(limits.quota())));
        Arc::clone(limiter.value())
    }

    /// Drop buckets that have refilled completely, then limiters left empty.
    pub fn prune(&self) {
        for limiter in self.limiters.iter() {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
        self.limiters.retain(|_, limiter| !limiter.is_empty());
        debug!(
            "Pruned rate limiters, {} key(s) still tracked",
            self.tracked_keys()
        );
    }

    /// Keys with a live bucket, across every limit configuration
    pub fn tracked_keys(&self) -> usize {
        self.limiters.iter().map(|limiter| limiter.len()).sum()
    }
}

impl Default for RateLimitGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Guard for RateLimitGuard {
    fn name(&self) -> &str {
        "rate-limit"
    }

    fn required_parameters(&self) -> &[&'static str] {
        REQUIRED
    }

    async fn admit(&self, key: &str, params: &GuardParams) -> Result<bool, GuardError> {
        let limits = Limits::from_params(params)?;
        let admitted = self.limiter_for(limits).check_key(&key.to_string()).is_ok();

        if self.admissions.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune();
        }
        Ok(admitted)
    }

    /// Tokens are consumed, never returned.
    async fn release(&self, _key: &str, _params: &GuardParams) -> Result<(), GuardError> {
        Ok(())
    }
}
