//! This module defines the interface for subscribing to the external edit
//! event feed.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

/// Custom error type for stream source operations.
#[derive(Error, Debug)]
pub enum StreamSourceError {
    /// The feed rejected the subscription with a status that is expected to
    /// clear on its own (overload, rate limiting, server-side faults).
    #[error("Feed temporarily rejected the subscription (status {0})")]
    Rejected(u16),

    /// The subscription request itself is malformed. Retried at the maximum
    /// backoff interval since the feed may still recover independently.
    #[error("Subscription request rejected as invalid (status {0})")]
    InvalidSubscription(u16),

    /// A transport-level failure while connecting or reading the stream.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The connect attempt did not complete within the configured timeout.
    #[error("Connect attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The server closed the stream.
    #[error("Stream ended by the server")]
    StreamEnded,
}

impl StreamSourceError {
    /// Whether the failure is expected to clear with normal backoff, as
    /// opposed to a malformed subscription request.
    pub fn is_transient(&self) -> bool {
        !matches!(self, StreamSourceError::InvalidSubscription(_))
    }
}

/// A trait for a source that can open a subscription to the event feed.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Opens a new subscription. The returned subscription fully replaces
    /// any previous one; the caller guarantees at most one is active.
    async fn connect(&self) -> Result<Box<dyn EventSubscription>, StreamSourceError>;
}

/// A live subscription yielding one raw event payload at a time.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventSubscription: Send {
    /// Waits for the next raw event payload. Blocks until data arrives, the
    /// stream fails, or the server ends it.
    async fn next_event(&mut self) -> Result<String, StreamSourceError>;
}
