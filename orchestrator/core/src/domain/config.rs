// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Orchestrator Configuration
//
// Pipeline-wide knobs, loaded from the `spec.orchestrator` section of an
// admission manifest or built in code.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Order in which granted guards are released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseOrder {
    /// Same order the guards were granted in
    #[default]
    Forward,
    /// Last granted first
    Reverse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub release_order: ReleaseOrder,

    /// Upper bound on a single `admit` call. Exceeding it is a guard failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admit_timeout_ms: Option<u64>,

    /// Resolve every operation's metadata at startup
    #[serde(default = "default_true")]
    pub preload: bool,
}

fn default_true() -> bool {
    true
}

impl OrchestratorConfig {
    pub fn admit_timeout(&self) -> Option<Duration> {
        self.admit_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_release_order(mut self, order: ReleaseOrder) -> Self {
        self.release_order = order;
        self
    }

    pub fn with_admit_timeout(mut self, timeout: Duration) -> Self {
        self.admit_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            release_order: ReleaseOrder::Forward,
            admit_timeout_ms: None,
            preload: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config: OrchestratorConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, OrchestratorConfig::default());
        assert_eq!(config.admit_timeout(), None);
    }

    #[test]
    fn test_reverse_order_and_timeout() {
        let config: OrchestratorConfig =
            serde_yaml::from_str("release_order: reverse\nadmit_timeout_ms: 250\n").unwrap();
        assert_eq!(config.release_order, ReleaseOrder::Reverse);
        assert_eq!(config.admit_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_oversized_timeout_saturates() {
        let config = OrchestratorConfig::default().with_admit_timeout(Duration::MAX);
        assert_eq!(config.admit_timeout_ms, Some(u64::MAX));

        let config = OrchestratorConfig::default().with_admit_timeout(Duration::from_millis(75));
        assert_eq!(config.admit_timeout_ms, Some(75));
    }
}
