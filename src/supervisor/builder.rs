//! This module provides the `SupervisorBuilder` for constructing a `Supervisor`.

use std::sync::Arc;

use crate::{
    config::AppConfig,
    persistence::traits::{AlertSink, SnapshotPublisher},
    providers::traits::StreamSource,
};

use super::{Supervisor, SupervisorError};

/// A builder for creating a `Supervisor` instance.
#[derive(Default)]
pub struct SupervisorBuilder {
    config: Option<AppConfig>,
    stream_source: Option<Arc<dyn StreamSource>>,
    snapshot_publisher: Option<Arc<dyn SnapshotPublisher>>,
    alert_sink: Option<Arc<dyn AlertSink>>,
}

impl SupervisorBuilder {
    /// Creates a new, empty `SupervisorBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application configuration for the `Supervisor`.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the stream source (e.g., the SSE client) for the `Supervisor`.
    pub fn stream_source(mut self, stream_source: Arc<dyn StreamSource>) -> Self {
        self.stream_source = Some(stream_source);
        self
    }

    /// Sets the snapshot publisher for the `Supervisor`.
    pub fn snapshot_publisher(mut self, publisher: Arc<dyn SnapshotPublisher>) -> Self {
        self.snapshot_publisher = Some(publisher);
        self
    }

    /// Sets the alert sink for the `Supervisor`.
    pub fn alert_sink(mut self, alert_sink: Arc<dyn AlertSink>) -> Self {
        self.alert_sink = Some(alert_sink);
        self
    }

    /// Assembles and validates the components to build a `Supervisor`.
    ///
    /// The main loop must never start with an invalid configuration, so the
    /// watch-list is re-validated here even when the config was constructed
    /// programmatically.
    pub fn build(self) -> Result<Supervisor, SupervisorError> {
        let config = self.config.ok_or(SupervisorError::MissingConfig)?;
        let stream_source = self.stream_source.ok_or(SupervisorError::MissingStreamSource)?;
        let snapshot_publisher =
            self.snapshot_publisher.ok_or(SupervisorError::MissingSnapshotPublisher)?;
        let alert_sink = self.alert_sink.ok_or(SupervisorError::MissingAlertSink)?;

        config
            .validate()
            .map_err(|e| SupervisorError::InvalidConfiguration(e.to_string()))?;

        Ok(Supervisor::new(config, stream_source, snapshot_publisher, alert_sink))
    }
}
