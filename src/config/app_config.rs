use std::{path::PathBuf, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

use super::{
    deserialize_duration_from_seconds, deserialize_url, RateAlertConfig, StreamRetryConfig,
};
use crate::models::Entity;

/// Provides the default value for shutdown_timeout.
fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Provides the default value for channel_capacity.
fn default_channel_capacity() -> u32 {
    1024
}

/// Provides the default value for output_dir.
fn default_output_dir() -> PathBuf {
    PathBuf::from("stream_output")
}

/// Provides the default value for stream_url.
fn default_stream_url() -> Url {
    Url::parse("https://stream.wikimedia.org/v2/stream/recentchange")
        .expect("default stream URL is valid")
}

/// Application configuration for wikiwatch.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The SSE endpoint delivering edit events.
    #[serde(default = "default_stream_url", deserialize_with = "deserialize_url")]
    pub stream_url: Url,

    /// Display names of the tracked entities, in canonical output order.
    pub watchlist: Vec<String>,

    /// Directory holding the metrics files and the alert log.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Reconnect and backoff policy for the stream connector.
    #[serde(default)]
    pub stream_retry: StreamRetryConfig,

    /// Per-entity edit-rate anomaly rule.
    #[serde(default)]
    pub rate_alert: RateAlertConfig,

    /// The capacity of the channels connecting the pipeline stages.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: u32,

    /// The maximum time to wait for graceful shutdown.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_shutdown_timeout"
    )]
    pub shutdown_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            stream_url: default_stream_url(),
            watchlist: Vec::new(),
            output_dir: default_output_dir(),
            stream_retry: StreamRetryConfig::default(),
            rate_alert: RateAlertConfig::default(),
            channel_capacity: default_channel_capacity(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading from the configuration directory.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir_str = config_dir.unwrap_or("configs");
        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/app.yaml", config_dir_str)))
            .add_source(Environment::with_prefix("WIKIWATCH").separator("__"))
            .build()?;
        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the process must not start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watchlist.is_empty() {
            return Err(ConfigError::Message(
                "watchlist must contain at least one entity".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for name in &self.watchlist {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::Message(format!(
                    "watchlist contains duplicate entity '{}'",
                    name
                )));
            }
        }
        Ok(())
    }

    /// The watch-list as `Entity` values, ids assigned in config order.
    pub fn entities(&self) -> Vec<Entity> {
        Entity::watchlist(&self.watchlist)
    }

    /// Path of the tabular metrics file.
    pub fn metrics_csv_path(&self) -> PathBuf {
        self.output_dir.join("metrics.csv")
    }

    /// Path of the structured metrics snapshot.
    pub fn snapshot_json_path(&self) -> PathBuf {
        self.output_dir.join("metrics_snapshot.json")
    }

    /// Path of the append-only alert log.
    pub fn alert_log_path(&self) -> PathBuf {
        self.output_dir.join("alerts.log")
    }

    /// Creates a new `AppConfigBuilder` for testing purposes.
    #[cfg(test)]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

/// A builder for creating `AppConfig` instances for testing.
#[cfg(test)]
#[derive(Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn stream_url(mut self, url: Url) -> Self {
        self.config.stream_url = url;
        self
    }

    pub fn watchlist(mut self, names: &[&str]) -> Self {
        self.config.watchlist = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn output_dir(mut self, dir: &std::path::Path) -> Self {
        self.config.output_dir = dir.to_path_buf();
        self
    }

    pub fn stream_retry(mut self, retry: StreamRetryConfig) -> Self {
        self.config.stream_retry = retry;
        self
    }

    pub fn rate_alert(mut self, rate: RateAlertConfig) -> Self {
        self.config.rate_alert = rate;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
