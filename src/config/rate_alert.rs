use std::time::Duration;

use serde::Deserialize;

use super::deserialize_duration_from_seconds;

fn default_window() -> Duration {
    // 30 minutes, matching the upstream feed's typical edit cadence.
    Duration::from_secs(30 * 60)
}

fn default_threshold() -> u64 {
    5
}

/// Configuration for the per-entity edit-rate anomaly rule.
#[derive(Debug, Deserialize, Clone)]
pub struct RateAlertConfig {
    /// The duration of the sliding window over accepted edits.
    #[serde(
        default = "default_window",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub window: Duration,

    /// The in-window edit count above which a rate anomaly is raised.
    #[serde(default = "default_threshold")]
    pub threshold: u64,
}

impl Default for RateAlertConfig {
    fn default() -> Self {
        Self { window: default_window(), threshold: default_threshold() }
    }
}
