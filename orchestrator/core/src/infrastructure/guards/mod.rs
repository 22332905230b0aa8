// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Built-in guards
//!
//! All three are in-process and partition their state by key:
//!
//! | Registry name | Type | Parameters |
//! |---------------|------|------------|
//! | `rate-limit` | [`RateLimitGuard`] | `rate` (per second), `capacity` (burst, defaults to `rate`) |
//! | `mutex` | [`MutexGuard`] | none |
//! | `concurrency` | [`ConcurrencyGuard`] | `max_concurrent` |
//!
//! None of them wait: a busy key is an immediate denial.

pub mod concurrency;
pub mod mutex;
pub mod rate_limit;

pub use concurrency::ConcurrencyGuard;
pub use mutex::MutexGuard;
pub use rate_limit::RateLimitGuard;
