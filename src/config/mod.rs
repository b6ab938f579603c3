//! Configuration module for wikiwatch.

mod app_config;
mod helpers;
mod rate_alert;
mod stream_retry;

pub use app_config::AppConfig;
pub use helpers::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, deserialize_url,
};
pub use rate_alert::RateAlertConfig;
pub use stream_retry::StreamRetryConfig;
