//! Reassembly tuning

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts, correlation window, and capacity of the reassembly buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassemblyConfig {
    /// Wait for missing tagged parts, reset on every arrival
    #[serde(default = "default_tagged_timeout_ms")]
    pub tagged_timeout_ms: u64,

    /// Wait for further fallback parts, reset on every arrival
    #[serde(default = "default_fallback_timeout_ms")]
    pub fallback_timeout_ms: u64,

    /// Untagged parts from the same sender within this window of the first
    /// part are correlated
    #[serde(default = "default_recency_window_ms")]
    pub recency_window_ms: u64,

    /// Untagged segments must be longer than this to be suspected splits
    #[serde(default = "default_split_min_length")]
    pub split_min_length: usize,

    /// Soft limit on open messages
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// How far below capacity an eviction pass goes
    #[serde(default = "default_eviction_headroom")]
    pub eviction_headroom: usize,
}

fn default_tagged_timeout_ms() -> u64 {
    30_000
}

fn default_fallback_timeout_ms() -> u64 {
    5_000
}

fn default_recency_window_ms() -> u64 {
    10_000
}

fn default_split_min_length() -> usize {
    100
}

fn default_capacity() -> usize {
    100
}

fn default_eviction_headroom() -> usize {
    10
}

impl Default for ReassemblyConfig {
    fn default() -> Self {
        Self {
            tagged_timeout_ms: default_tagged_timeout_ms(),
            fallback_timeout_ms: default_fallback_timeout_ms(),
            recency_window_ms: default_recency_window_ms(),
            split_min_length: default_split_min_length(),
            capacity: default_capacity(),
            eviction_headroom: default_eviction_headroom(),
        }
    }
}

impl ReassemblyConfig {
    pub fn tagged_timeout(&self) -> Duration {
        Duration::from_millis(self.tagged_timeout_ms)
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_timeout_ms)
    }

    /// Number of open messages left after an eviction pass
    pub fn eviction_target(&self) -> usize {
        self.capacity.saturating_sub(self.eviction_headroom)
    }
}
