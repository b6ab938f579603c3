//! This module defines the interfaces for durable outputs: metrics
//! snapshots and the alert log.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::error::PersistenceError;
use crate::models::{Alert, Snapshot};

/// A destination for full metrics snapshots.
///
/// Implementations hold no aggregation state; each call writes the whole
/// snapshot, and a reader must never observe a half-written result.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SnapshotPublisher: Send + Sync {
    /// Serializes and durably writes the snapshot.
    async fn publish(&self, snapshot: &Snapshot) -> Result<(), PersistenceError>;
}

/// An append-only destination for alerts. Never rewritten or truncated
/// during a run.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Appends one alert.
    async fn append(&self, alert: &Alert) -> Result<(), PersistenceError>;
}
