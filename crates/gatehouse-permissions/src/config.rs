//! Permission loading configuration.

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// RetryConfig
// ---------------------------------------------------------------------------

/// Backoff policy for [`PermissionStore::load_with_retry`](crate::PermissionStore::load_with_retry).
///
/// Delay before retry `n` (1-based) is `base_delay * 2^(n-1)`, capped at
/// `max_delay`, plus a random jitter in `0..=jitter`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first. 1 disables retrying.
    pub max_attempts: u32,
    #[serde(rename = "base_delay_ms", with = "millis")]
    pub base_delay: Duration,
    #[serde(rename = "max_delay_ms", with = "millis")]
    pub max_delay: Duration,
    #[serde(rename = "jitter_ms", with = "millis")]
    pub jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryConfig {
    /// No retries: a single attempt.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// The backoff before retry number `retry` (1-based), without jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// The backoff before retry number `retry`, with jitter applied.
    pub(crate) fn delay(&self, retry: u32) -> Duration {
        let jitter_ms = whole_millis(self.jitter);
        let extra = if jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_ms)
        };
        self.backoff(retry) + Duration::from_millis(extra)
    }
}

/// `duration` in milliseconds, saturating at `u64::MAX`.
pub(crate) fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// PermissionConfig
// ---------------------------------------------------------------------------

/// Settings for a [`PermissionStore`](crate::PermissionStore).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    /// Upper bound on one permission query.
    #[serde(rename = "request_timeout_ms", with = "millis")]
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }
}

/// Durations are written as integer milliseconds in config files.
///
/// Use with `#[serde(with = "gatehouse_permissions::millis")]`.
pub mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let retry = RetryConfig {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            jitter: Duration::ZERO,
        };
        assert_eq!(retry.backoff(1), Duration::from_millis(100));
        assert_eq!(retry.backoff(2), Duration::from_millis(200));
        assert_eq!(retry.backoff(3), Duration::from_millis(400));
        assert_eq!(retry.backoff(4), Duration::from_millis(500));
        assert_eq!(retry.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn test_delay_stays_within_jitter_bound() {
        let retry = RetryConfig {
            jitter: Duration::from_millis(50),
            ..RetryConfig::default()
        };
        for _ in 0..100 {
            let delay = retry.delay(1);
            assert!(delay >= retry.backoff(1));
            assert!(delay <= retry.backoff(1) + Duration::from_millis(50));
        }
    }

    #[test]
    fn test_whole_millis_saturates_instead_of_truncating() {
        assert_eq!(whole_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(whole_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_disabled_is_single_attempt() {
        assert_eq!(RetryConfig::disabled().max_attempts, 1);
    }

    #[test]
    fn test_permission_config_default() {
        let config = PermissionConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_attempts, 3);
    }
}
