//! The EditPipeline consumes raw payloads from the connector and drives the
//! decoder, aggregator and rate tracking.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    engine::{aggregator::MetricsAggregator, alert_monitor::AlertMonitor, decoder::EventDecoder},
    persistence::traits::{AlertSink, SnapshotPublisher},
};

/// The pipeline service.
///
/// Owns the decoder and the aggregator outright, so every `apply` is
/// serialized by construction. On shutdown it publishes one final snapshot
/// before returning.
pub struct EditPipeline<P: SnapshotPublisher + ?Sized, S: AlertSink + ?Sized> {
    /// Decodes and filters raw payloads.
    decoder: EventDecoder,
    /// The single owner of the metrics state.
    aggregator: MetricsAggregator<P>,
    /// Receives one timestamp per accepted edit for rate tracking.
    alert_monitor: Arc<AlertMonitor<S>>,
    /// The receiver for raw event payloads.
    raw_events_rx: mpsc::Receiver<String>,
    /// A token used to signal a graceful shutdown.
    cancellation_token: CancellationToken,
}

impl<P: SnapshotPublisher + ?Sized, S: AlertSink + ?Sized> EditPipeline<P, S> {
    /// Creates a new EditPipeline instance.
    pub fn new(
        decoder: EventDecoder,
        aggregator: MetricsAggregator<P>,
        alert_monitor: Arc<AlertMonitor<S>>,
        raw_events_rx: mpsc::Receiver<String>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self { decoder, aggregator, alert_monitor, raw_events_rx, cancellation_token }
    }

    /// Starts the long-running service loop.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("EditPipeline cancellation signal received, shutting down...");
                    break;
                }

                maybe_payload = self.raw_events_rx.recv() => match maybe_payload {
                    Some(payload) => self.process(&payload).await,
                    None => {
                        tracing::info!("Raw events channel closed, stopping pipeline.");
                        break;
                    }
                },
            }
        }

        // One last publish so the files reflect the state at shutdown.
        self.aggregator.publish().await;
        let drops = self.decoder.drops();
        tracing::info!(
            malformed = drops.malformed,
            other_type = drops.other_type,
            unwatched = drops.unwatched,
            "EditPipeline has shut down."
        );
    }

    /// Processes one raw payload end to end.
    async fn process(&mut self, payload: &str) {
        let Some(record) = self.decoder.decode(payload) else { return };

        if let Some(updated) = self.aggregator.apply(&record).await {
            tracing::debug!(
                entity = %updated.entity,
                edit_count = updated.edit_count,
                editor = updated.last_editor.as_deref().unwrap_or(""),
                "Applied edit."
            );
        }
        self.alert_monitor.record_edit(record.entity_id, record.timestamp).await;
    }
}
