//! Backoff between flush attempts.

use crate::PersistenceConfig;
use std::time::Duration;
use tokio_retry2::strategy::{ExponentialFactorBackoff, jitter};

/// Exponential backoff: `base`, `2 * base`, `4 * base`, ... capped at
/// `max_delay`, optionally jittered. A jittered delay never exceeds the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl Backoff {
    /// Backoff with the given base and cap.
    pub fn new(base: Duration, max_delay: Duration, jitter: bool) -> Self {
        Self {
            base,
            max_delay,
            jitter,
        }
    }

    /// Backoff described by the persistence settings.
    pub fn from_config(config: &PersistenceConfig) -> Self {
        Self::new(
            Duration::from_millis(*config.retry_base_ms()),
            Duration::from_millis(*config.retry_max_delay_ms()),
            *config.jitter(),
        )
    }

    /// Longest delay the schedule yields.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Delays to wait after the first, second, ... failed attempt.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + Send {
        let max_delay = self.max_delay;
        let jittered = self.jitter;
        let base_ms = u64::try_from(self.base.as_millis()).unwrap_or(u64::MAX);
        ExponentialFactorBackoff::from_millis(base_ms, 2.0)
            .max_delay(max_delay)
            .map(move |delay| {
                if jittered {
                    jitter(delay).min(max_delay)
                } else {
                    delay
                }
            })
    }
}
