use std::time::Duration;

use serde::Deserialize;

use super::{deserialize_duration_from_ms, deserialize_duration_from_seconds};

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(1000)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(60)
}

fn default_escalation_threshold() -> u32 {
    3
}

/// Configuration for the stream reconnect and backoff policy.
#[derive(Debug, Deserialize, Clone)]
pub struct StreamRetryConfig {
    /// The maximum time to wait for a single connect attempt, distinct from
    /// the backoff delay between attempts.
    #[serde(
        default = "default_connect_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub connect_timeout: Duration,

    /// The backoff delay after the first failure. Doubles per consecutive
    /// failure.
    #[serde(
        default = "default_initial_backoff",
        deserialize_with = "deserialize_duration_from_ms"
    )]
    pub initial_backoff: Duration,

    /// The cap on the backoff delay. The retry count itself is unbounded.
    #[serde(
        default = "default_max_backoff",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub max_backoff: Duration,

    /// The number of consecutive failures at which connection alerts
    /// escalate to critical severity.
    #[serde(default = "default_escalation_threshold")]
    pub escalation_threshold: u32,
}

impl Default for StreamRetryConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
            escalation_threshold: default_escalation_threshold(),
        }
    }
}

impl StreamRetryConfig {
    /// Computes the backoff delay for the given consecutive-failure count
    /// (1-based): exponential doubling capped at `max_backoff`.
    pub fn delay_for(&self, consecutive_failures: u32) -> Duration {
        // Exponent is clamped so the multiplication cannot overflow.
        let exp = consecutive_failures.saturating_sub(1).min(16);
        let delay = self.initial_backoff.saturating_mul(2u32.saturating_pow(exp));
        delay.min(self.max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_per_failure_and_caps_at_max() {
        let config = StreamRetryConfig {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            ..Default::default()
        };

        assert_eq!(config.delay_for(1), Duration::from_millis(500));
        assert_eq!(config.delay_for(2), Duration::from_secs(1));
        assert_eq!(config.delay_for(3), Duration::from_secs(2));
        assert_eq!(config.delay_for(5), Duration::from_secs(8));
        assert_eq!(config.delay_for(100), Duration::from_secs(8));
    }

    #[test]
    fn delay_for_zero_failures_is_the_initial_backoff() {
        let config = StreamRetryConfig::default();
        assert_eq!(config.delay_for(0), config.initial_backoff);
    }
}
