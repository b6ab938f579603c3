//! The Supervisor module manages the lifecycle of the wikiwatch application.
//!
//! The supervisor owns every long-running service of the pipeline: the
//! stream connector, the edit pipeline, and the connection-failure consumer.
//! It wires them together with channels, listens for shutdown signals
//! (Ctrl+C or SIGTERM), and orchestrates a graceful shutdown in which
//! in-flight apply/publish calls complete before the process exits.

mod builder;

use std::sync::Arc;

use builder::SupervisorBuilder;
use thiserror::Error;
use tokio::{signal, sync::mpsc};

use crate::{
    config::AppConfig,
    engine::{
        aggregator::MetricsAggregator,
        alert_monitor::AlertMonitor,
        connector::{ConnectionFailure, StreamConnector},
        decoder::EventDecoder,
        pipeline::EditPipeline,
    },
    persistence::traits::{AlertSink, SnapshotPublisher},
    providers::traits::StreamSource,
};

/// Represents the set of errors that can occur during the supervisor's
/// operation.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required configuration was not provided to the `SupervisorBuilder`.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,

    /// A stream source was not provided to the `SupervisorBuilder`.
    #[error("Missing stream source for Supervisor")]
    MissingStreamSource,

    /// A snapshot publisher was not provided to the `SupervisorBuilder`.
    #[error("Missing snapshot publisher for Supervisor")]
    MissingSnapshotPublisher,

    /// An alert sink was not provided to the `SupervisorBuilder`.
    #[error("Missing alert sink for Supervisor")]
    MissingAlertSink,

    /// An error occurred due to an invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// The primary runtime manager for the application.
///
/// The Supervisor owns all the major components (services) and is
/// responsible for their startup, shutdown, and health monitoring. Once
/// `run` is called, it becomes the main process loop for the entire
/// application.
pub struct Supervisor {
    /// Shared application configuration.
    config: Arc<AppConfig>,

    /// The source used to open feed subscriptions.
    stream_source: Arc<dyn StreamSource>,

    /// The destination for metrics snapshots.
    snapshot_publisher: Arc<dyn SnapshotPublisher>,

    /// The durable alert log.
    alert_sink: Arc<dyn AlertSink>,

    /// A token used to signal a graceful shutdown to all supervised tasks.
    cancellation_token: tokio_util::sync::CancellationToken,

    /// A set of all spawned tasks that the supervisor is actively managing.
    join_set: tokio::task::JoinSet<()>,
}

impl Supervisor {
    /// Creates a new Supervisor instance with all its required components.
    ///
    /// This is typically called by the `SupervisorBuilder` after it has
    /// assembled all the necessary dependencies.
    pub fn new(
        config: AppConfig,
        stream_source: Arc<dyn StreamSource>,
        snapshot_publisher: Arc<dyn SnapshotPublisher>,
        alert_sink: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            stream_source,
            snapshot_publisher,
            alert_sink,
            cancellation_token: tokio_util::sync::CancellationToken::new(),
            join_set: tokio::task::JoinSet::new(),
        }
    }

    /// Returns a new `SupervisorBuilder` instance.
    ///
    /// This is the public entry point for creating a supervisor.
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    /// Starts the supervisor and all its managed services.
    ///
    /// This method is the main entry point for the application's runtime:
    /// 1. Publishes the bootstrap snapshot before any event can arrive.
    /// 2. Spawns a signal handler for `SIGINT` (Ctrl+C) and `SIGTERM`.
    /// 3. Spawns the connector, the pipeline, and the failure consumer.
    /// 4. Monitors task health; a failed task triggers a clean shutdown.
    /// 5. On shutdown, waits (bounded by the shutdown timeout) for tasks to
    ///    finish their in-flight work.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let entities = self.config.entities();
        tracing::info!(
            watchlist = ?self.config.watchlist,
            rate_threshold = self.config.rate_alert.threshold,
            rate_window = ?self.config.rate_alert.window,
            "Starting ingestion for watch-list."
        );

        // Clone the token for the signal handler task.
        let cancellation_token = self.cancellation_token.clone();

        // Spawn a task to listen for shutdown signals.
        self.join_set.spawn(async move {
            let ctrl_c = signal::ctrl_c();
            #[cfg(unix)]
            let terminate = async {
                signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler")
                    .recv()
                    .await;
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
                _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
                _ = cancellation_token.cancelled() => {}
            }

            // Notify all other tasks to begin shutting down.
            cancellation_token.cancel();
        });

        // --- Service Initialization ---

        // Create the channel that connects the StreamConnector to the
        // EditPipeline.
        let (raw_events_tx, raw_events_rx) =
            mpsc::channel::<String>(self.config.channel_capacity as usize);

        // Create the channel that carries connector failures to the
        // AlertMonitor.
        let (failures_tx, mut failures_rx) =
            mpsc::channel::<ConnectionFailure>(self.config.channel_capacity as usize);

        let alert_monitor = Arc::new(AlertMonitor::new(
            &entities,
            &self.config.rate_alert,
            self.config.stream_retry.escalation_threshold,
            Arc::clone(&self.alert_sink),
        ));

        // A valid snapshot must exist before the first event is delivered.
        let aggregator =
            MetricsAggregator::new(&entities, Arc::clone(&self.snapshot_publisher));
        aggregator.bootstrap().await;

        // --- Task Spawning ---

        // Spawn the StreamConnector service.
        let connector = StreamConnector::new(
            self.config.stream_retry.clone(),
            Arc::clone(&self.stream_source),
            raw_events_tx,
            failures_tx,
            self.cancellation_token.clone(),
        );
        self.join_set.spawn(async move {
            connector.run().await;
        });

        // Spawn the EditPipeline service.
        let pipeline = EditPipeline::new(
            EventDecoder::new(&entities),
            aggregator,
            Arc::clone(&alert_monitor),
            raw_events_rx,
            self.cancellation_token.clone(),
        );
        self.join_set.spawn(async move {
            pipeline.run().await;
        });

        // Spawn the connection-failure consumer. It drains naturally once
        // the connector drops its sender.
        let failure_monitor = Arc::clone(&alert_monitor);
        self.join_set.spawn(async move {
            while let Some(failure) = failures_rx.recv().await {
                failure_monitor.connection_failure(&failure).await;
            }
        });

        // --- Main Supervisor Loop ---
        // Only responsible for monitoring task health and shutdown signals.

        loop {
            tokio::select! {
                maybe_result = self.join_set.join_next() => {
                    match maybe_result {
                        Some(Ok(_)) => {
                            // Task completed, continue monitoring the rest.
                        }
                        Some(Err(e)) => {
                            tracing::error!("A critical task failed: {:?}. Initiating shutdown.", e);
                            self.cancellation_token.cancel();
                        }
                        None => {
                            // All tasks have completed.
                            break;
                        }
                    }
                }
                _ = self.cancellation_token.cancelled() => {
                    // Cancellation requested externally, break the loop.
                    break;
                }
            }
        }

        // --- Graceful Shutdown ---

        // Give tasks the shutdown timeout to finish in-flight apply/publish
        // work, then abort whatever is left.
        let shutdown_timeout = self.config.shutdown_timeout;
        let drain = async {
            while self.join_set.join_next().await.is_some() {}
        };
        if tokio::time::timeout(shutdown_timeout, drain).await.is_err() {
            tracing::warn!(
                "Tasks did not complete within the timeout of {:?}. Aborting remaining tasks.",
                shutdown_timeout
            );
            self.join_set.shutdown().await;
        }

        tracing::info!("Supervisor shutdown complete.");
        Ok(())
    }
}
