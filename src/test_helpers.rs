//! A set of helpers for testing

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    models::{Alert, Snapshot},
    persistence::{error::PersistenceError, traits::{AlertSink, SnapshotPublisher}},
    providers::traits::{EventSubscription, StreamSource, StreamSourceError},
};

/// Builds a raw feed payload for an edit event, as the decoder expects it.
pub fn sample_edit_payload(title: &str, user: &str, comment: &str, timestamp: i64) -> String {
    serde_json::json!({
        "title": title,
        "type": "edit",
        "user": user,
        "comment": comment,
        "timestamp": timestamp,
    })
    .to_string()
}

/// An `AlertSink` that records every appended alert in memory.
#[derive(Default)]
pub struct RecordingAlertSink {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlertSink {
    /// Returns a copy of all alerts appended so far.
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn append(&self, alert: &Alert) -> Result<(), PersistenceError> {
        self.alerts.lock().unwrap_or_else(|e| e.into_inner()).push(alert.clone());
        Ok(())
    }
}

/// A `SnapshotPublisher` that records every published snapshot in memory.
#[derive(Default)]
pub struct RecordingSnapshotPublisher {
    snapshots: Mutex<Vec<Snapshot>>,
}

impl RecordingSnapshotPublisher {
    /// Returns a copy of all snapshots published so far.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SnapshotPublisher for RecordingSnapshotPublisher {
    async fn publish(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        self.snapshots.lock().unwrap_or_else(|e| e.into_inner()).push(snapshot.clone());
        Ok(())
    }
}

/// A `StreamSource` that replays a fixed list of payloads once and then
/// blocks forever, for end-to-end pipeline tests.
pub struct ScriptedStreamSource {
    payloads: Mutex<Vec<String>>,
}

impl ScriptedStreamSource {
    /// Creates a source that will deliver the given payloads in order.
    pub fn new(payloads: Vec<String>) -> Self {
        Self { payloads: Mutex::new(payloads) }
    }
}

#[async_trait]
impl StreamSource for ScriptedStreamSource {
    async fn connect(&self) -> Result<Box<dyn EventSubscription>, StreamSourceError> {
        let payloads = std::mem::take(&mut *self.payloads.lock().unwrap_or_else(|e| e.into_inner()));
        Ok(Box::new(ScriptedSubscription { payloads: payloads.into_iter().collect() }))
    }
}

struct ScriptedSubscription {
    payloads: std::collections::VecDeque<String>,
}

#[async_trait]
impl EventSubscription for ScriptedSubscription {
    async fn next_event(&mut self) -> Result<String, StreamSourceError> {
        match self.payloads.pop_front() {
            Some(payload) => Ok(payload),
            // Mimic an idle feed: block until the pipeline is cancelled.
            None => std::future::pending().await,
        }
    }
}
