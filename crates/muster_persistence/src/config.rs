//! Flush controller settings.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Tuning for batching, self-heal and retries.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct PersistenceConfig {
    /// Maximum rows per batched DELETE or INSERT
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,

    /// Every Nth hinted flush is widened to all tables
    #[serde(default = "default_full_scan_every")]
    full_scan_every: u64,

    /// Attempts per flush before giving up
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,

    /// Delay after the first failed attempt, doubled for each later one
    #[serde(default = "default_retry_base_ms")]
    retry_base_ms: u64,

    /// Upper bound on any single delay
    #[serde(default = "default_retry_max_delay_ms")]
    retry_max_delay_ms: u64,

    /// Randomize delays to spread reconnect storms
    #[serde(default = "default_jitter")]
    jitter: bool,
}

fn default_chunk_size() -> usize {
    500
}

fn default_full_scan_every() -> u64 {
    25
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_base_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    5_000
}

fn default_jitter() -> bool {
    true
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            full_scan_every: default_full_scan_every(),
            max_attempts: default_max_attempts(),
            retry_base_ms: default_retry_base_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_falls_back_to_defaults() {
        let config = PersistenceConfigBuilder::default()
            .max_attempts(3)
            .build()
            .unwrap();
        assert_eq!(*config.max_attempts(), 3);
        assert_eq!(*config.chunk_size(), 500);
        assert_eq!(*config.full_scan_every(), 25);
    }

    #[test]
    fn test_setters_chain() {
        let config = PersistenceConfig::default()
            .with_jitter(false)
            .with_retry_base_ms(10);
        assert!(!config.jitter());
        assert_eq!(*config.retry_base_ms(), 10);
    }
}
