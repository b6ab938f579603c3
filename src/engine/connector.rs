//! The StreamConnector maintains the long-lived feed subscription and feeds
//! raw event payloads into the processing pipeline.
//!
//! Reconnection is modeled as an explicit state machine (`Disconnected`,
//! `Connecting`, `Streaming`, `Backoff`) rather than as error handling
//! around a read loop. The retry count is unbounded; the process is expected
//! to outlive any feed outage.

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    config::StreamRetryConfig,
    providers::traits::{EventSubscription, StreamSource, StreamSourceError},
};

/// Notification sent to the alert monitor once per failed retry cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionFailure {
    /// Human-readable failure reason.
    pub reason: String,

    /// How many cycles in a row have now failed, this one included.
    pub consecutive_failures: u32,

    /// The backoff delay before the next connect attempt.
    pub next_retry_in: Duration,

    /// Whether the subscription request itself was rejected as invalid.
    pub unrecoverable: bool,
}

/// The connector's position in its reconnect lifecycle.
enum ConnectorState {
    /// No subscription and no pending work.
    Disconnected,
    /// A connect attempt is due.
    Connecting,
    /// An active subscription is delivering events.
    Streaming(Box<dyn EventSubscription>),
    /// Waiting out the backoff delay before reconnecting.
    Backoff(Duration),
}

/// The stream connector service.
///
/// Holds at most one active subscription at a time; a failed subscription is
/// dropped before the replacement is opened, so a reconnect never duplicates
/// in-flight delivery.
pub struct StreamConnector {
    /// Reconnect and backoff policy.
    retry: StreamRetryConfig,
    /// The source used to open subscriptions.
    source: Arc<dyn StreamSource>,
    /// The sender for raw event payloads.
    raw_events_tx: mpsc::Sender<String>,
    /// The sender for per-cycle failure notifications.
    failures_tx: mpsc::Sender<ConnectionFailure>,
    /// A token used to signal a graceful shutdown.
    cancellation_token: CancellationToken,
    /// Failed cycles since the last successful connect.
    consecutive_failures: u32,
}

impl StreamConnector {
    /// Creates a new StreamConnector instance.
    pub fn new(
        retry: StreamRetryConfig,
        source: Arc<dyn StreamSource>,
        raw_events_tx: mpsc::Sender<String>,
        failures_tx: mpsc::Sender<ConnectionFailure>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            retry,
            source,
            raw_events_tx,
            failures_tx,
            cancellation_token,
            consecutive_failures: 0,
        }
    }

    /// Starts the long-running connect/stream/backoff loop.
    pub async fn run(mut self) {
        let mut state = ConnectorState::Disconnected;
        loop {
            if self.cancellation_token.is_cancelled() {
                break;
            }
            state = match state {
                ConnectorState::Disconnected => ConnectorState::Connecting,
                ConnectorState::Connecting => self.connect().await,
                ConnectorState::Streaming(subscription) => {
                    match self.stream(subscription).await {
                        Some(next) => next,
                        None => break,
                    }
                }
                ConnectorState::Backoff(delay) => {
                    tokio::select! {
                        biased;
                        _ = self.cancellation_token.cancelled() => break,
                        _ = tokio::time::sleep(delay) => ConnectorState::Connecting,
                    }
                }
            };
        }
        tracing::info!("StreamConnector has shut down.");
    }

    /// Performs one connect attempt, bounded by the connect timeout.
    async fn connect(&mut self) -> ConnectorState {
        tracing::debug!("Opening feed subscription...");
        let attempt = tokio::time::timeout(self.retry.connect_timeout, self.source.connect());

        tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => ConnectorState::Disconnected,
            result = attempt => match result {
                Ok(Ok(subscription)) => {
                    self.consecutive_failures = 0;
                    tracing::info!("Feed subscription established.");
                    ConnectorState::Streaming(subscription)
                }
                Ok(Err(e)) => self.fail(e).await,
                Err(_) => {
                    self.fail(StreamSourceError::ConnectTimeout(self.retry.connect_timeout)).await
                }
            },
        }
    }

    /// Delivers events from an active subscription until it fails or
    /// shutdown is requested. Returns `None` when the connector should stop.
    async fn stream(&mut self, mut subscription: Box<dyn EventSubscription>) -> Option<ConnectorState> {
        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => return None,
                event = subscription.next_event() => match event {
                    Ok(payload) => {
                        if self.raw_events_tx.send(payload).await.is_err() {
                            tracing::warn!("Raw events channel closed, stopping connector.");
                            return None;
                        }
                    }
                    Err(e) => {
                        // The dead subscription is dropped here, before the
                        // replacement is opened.
                        return Some(self.fail(e).await);
                    }
                },
            }
        }
    }

    /// Records one failed cycle: computes the next delay, notifies the alert
    /// monitor, and transitions to backoff.
    async fn fail(&mut self, error: StreamSourceError) -> ConnectorState {
        self.consecutive_failures += 1;
        let transient = error.is_transient();
        // An invalid subscription retries at the cap; the feed may recover
        // independently of this process.
        let delay = if transient {
            self.retry.delay_for(self.consecutive_failures)
        } else {
            self.retry.max_backoff
        };

        tracing::warn!(
            error = %error,
            consecutive_failures = self.consecutive_failures,
            next_retry_in = ?delay,
            "Feed connection failure, backing off."
        );

        let failure = ConnectionFailure {
            reason: error.to_string(),
            consecutive_failures: self.consecutive_failures,
            next_retry_in: delay,
            unrecoverable: !transient,
        };
        if self.failures_tx.send(failure).await.is_err() {
            tracing::warn!("Connection failure channel closed, notification not delivered.");
        }

        ConnectorState::Backoff(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::traits::{MockEventSubscription, MockStreamSource};
    use mockall::Sequence;

    fn test_retry_config() -> StreamRetryConfig {
        StreamRetryConfig {
            connect_timeout: Duration::from_millis(100),
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            escalation_threshold: 3,
        }
    }

    fn build_connector(
        source: MockStreamSource,
        raw_tx: mpsc::Sender<String>,
        failures_tx: mpsc::Sender<ConnectionFailure>,
        token: CancellationToken,
    ) -> StreamConnector {
        StreamConnector::new(test_retry_config(), Arc::new(source), raw_tx, failures_tx, token)
    }

    #[tokio::test]
    async fn repeated_rejections_notify_once_per_cycle_and_keep_retrying() {
        let mut source = MockStreamSource::new();
        source.expect_connect().returning(|| Err(StreamSourceError::Rejected(503)));

        let (raw_tx, _raw_rx) = mpsc::channel(8);
        let (failures_tx, mut failures_rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let connector = build_connector(source, raw_tx, failures_tx, token.clone());
        let handle = tokio::spawn(connector.run());

        for expected_count in 1..=5u32 {
            let failure = failures_rx.recv().await.expect("expected a failure notification");
            assert_eq!(failure.consecutive_failures, expected_count);
            assert!(!failure.unrecoverable);
            assert!(failure.reason.contains("503"));
        }

        // Still running after five rejections; only cancellation stops it.
        assert!(!handle.is_finished());
        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn backoff_delay_doubles_across_consecutive_failures() {
        let mut source = MockStreamSource::new();
        source.expect_connect().returning(|| Err(StreamSourceError::Rejected(429)));

        let (raw_tx, _raw_rx) = mpsc::channel(8);
        let (failures_tx, mut failures_rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let connector = build_connector(source, raw_tx, failures_tx, token.clone());
        let handle = tokio::spawn(connector.run());

        let first = failures_rx.recv().await.unwrap();
        let second = failures_rx.recv().await.unwrap();
        let third = failures_rx.recv().await.unwrap();
        assert_eq!(first.next_retry_in, Duration::from_millis(1));
        assert_eq!(second.next_retry_in, Duration::from_millis(2));
        assert_eq!(third.next_retry_in, Duration::from_millis(4));

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn invalid_subscription_backs_off_at_the_cap_and_escalates() {
        let mut source = MockStreamSource::new();
        source.expect_connect().returning(|| Err(StreamSourceError::InvalidSubscription(400)));

        let (raw_tx, _raw_rx) = mpsc::channel(8);
        let (failures_tx, mut failures_rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let connector = build_connector(source, raw_tx, failures_tx, token.clone());
        let handle = tokio::spawn(connector.run());

        let failure = failures_rx.recv().await.unwrap();
        assert!(failure.unrecoverable);
        assert_eq!(failure.next_retry_in, Duration::from_millis(4));
        assert_eq!(failure.consecutive_failures, 1);

        // Still retrying: the connector never gives up on its own.
        let next = failures_rx.recv().await.unwrap();
        assert_eq!(next.consecutive_failures, 2);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn delivers_payloads_then_reconnects_when_the_stream_ends() {
        let mut sequence = Sequence::new();
        let mut subscription = MockEventSubscription::new();
        subscription
            .expect_next_event()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|| Ok("first".to_string()));
        subscription
            .expect_next_event()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|| Ok("second".to_string()));
        subscription
            .expect_next_event()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|| Err(StreamSourceError::StreamEnded));

        let mut connect_sequence = Sequence::new();
        let mut source = MockStreamSource::new();
        source
            .expect_connect()
            .times(1)
            .in_sequence(&mut connect_sequence)
            .return_once(move || Ok(Box::new(subscription) as Box<dyn EventSubscription>));
        source
            .expect_connect()
            .returning(|| Err(StreamSourceError::Rejected(503)));

        let (raw_tx, mut raw_rx) = mpsc::channel(8);
        let (failures_tx, mut failures_rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let connector = build_connector(source, raw_tx, failures_tx, token.clone());
        let handle = tokio::spawn(connector.run());

        assert_eq!(raw_rx.recv().await.as_deref(), Some("first"));
        assert_eq!(raw_rx.recv().await.as_deref(), Some("second"));

        // The mid-stream disconnect counts as one failed cycle.
        let failure = failures_rx.recv().await.unwrap();
        assert_eq!(failure.consecutive_failures, 1);
        assert!(failure.reason.contains("Stream ended"));

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn successful_connect_resets_the_failure_count() {
        let mut subscription = MockEventSubscription::new();
        subscription.expect_next_event().returning(|| Err(StreamSourceError::StreamEnded));

        let mut sequence = Sequence::new();
        let mut source = MockStreamSource::new();
        source
            .expect_connect()
            .times(2)
            .in_sequence(&mut sequence)
            .returning(|| Err(StreamSourceError::Rejected(503)));
        source
            .expect_connect()
            .times(1)
            .in_sequence(&mut sequence)
            .return_once(move || Ok(Box::new(subscription) as Box<dyn EventSubscription>));
        source
            .expect_connect()
            .returning(|| Err(StreamSourceError::Rejected(503)));

        let (raw_tx, _raw_rx) = mpsc::channel(8);
        let (failures_tx, mut failures_rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let connector = build_connector(source, raw_tx, failures_tx, token.clone());
        let handle = tokio::spawn(connector.run());

        assert_eq!(failures_rx.recv().await.unwrap().consecutive_failures, 1);
        assert_eq!(failures_rx.recv().await.unwrap().consecutive_failures, 2);
        // After the successful connect, the stream ends immediately and the
        // count starts over.
        assert_eq!(failures_rx.recv().await.unwrap().consecutive_failures, 1);

        token.cancel();
        handle.await.unwrap();
    }
}
