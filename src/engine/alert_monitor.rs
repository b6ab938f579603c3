//! The AlertMonitor turns connector failures and edit-arrival rates into
//! durable alerts.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::Mutex;

use crate::{
    config::RateAlertConfig,
    engine::connector::ConnectionFailure,
    models::{Alert, AlertCategory, AlertSeverity, Entity},
    persistence::traits::AlertSink,
};

/// Per-entity sliding-window state.
#[derive(Debug, Default)]
struct EntityWindow {
    /// Timestamps of accepted edits still inside the window.
    edits: VecDeque<DateTime<Utc>>,
    /// Set while the window count is above threshold; cleared once it drops
    /// back. This is what makes the rate alert edge-triggered.
    alerting: bool,
}

/// Watches the connector and the edit-arrival rate and appends alerts to a
/// durable sink.
///
/// The window state has its own lock, independent of the aggregator's
/// serialization; rate tracking and connection alerts never contend with
/// metric updates.
pub struct AlertMonitor<S: AlertSink + ?Sized> {
    /// The durable, append-only alert destination.
    sink: Arc<S>,
    /// Entity id to display name, for alert messages.
    names: HashMap<i64, String>,
    /// Sliding window duration.
    window: chrono::Duration,
    /// In-window edit count above which an anomaly is raised.
    threshold: u64,
    /// Consecutive connection failures at which severity escalates.
    escalation_threshold: u32,
    /// Per-entity window state.
    windows: Mutex<HashMap<i64, EntityWindow>>,
}

impl<S: AlertSink + ?Sized> AlertMonitor<S> {
    /// Creates a new AlertMonitor instance.
    pub fn new(
        watchlist: &[Entity],
        rate: &RateAlertConfig,
        escalation_threshold: u32,
        sink: Arc<S>,
    ) -> Self {
        Self {
            sink,
            names: watchlist.iter().map(|e| (e.id, e.display_name.clone())).collect(),
            window: chrono::Duration::from_std(rate.window)
                .unwrap_or_else(|_| chrono::Duration::seconds(i64::MAX / 1_000)),
            threshold: rate.threshold,
            escalation_threshold,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Records one accepted edit and raises a `rate_anomaly` alert on the
    /// transition from normal to above-threshold.
    pub async fn record_edit(&self, entity_id: i64, timestamp: DateTime<Utc>) {
        let Some(name) = self.names.get(&entity_id) else { return };

        let alert = {
            let mut windows = self.windows.lock().await;
            let window = windows.entry(entity_id).or_default();

            let cutoff = timestamp - self.window;
            while window.edits.front().is_some_and(|t| *t < cutoff) {
                window.edits.pop_front();
            }
            window.edits.push_back(timestamp);

            let count = window.edits.len() as u64;
            if count > self.threshold {
                if window.alerting {
                    None
                } else {
                    window.alerting = true;
                    Some(Alert::new(
                        AlertSeverity::Warning,
                        AlertCategory::RateAnomaly,
                        format!(
                            "'{}' had {} edits in the last {}s",
                            name,
                            count,
                            self.window.num_seconds()
                        ),
                        json!({
                            "entity": name,
                            "count": count,
                            "window_secs": self.window.num_seconds(),
                            "threshold": self.threshold,
                        }),
                    ))
                }
            } else {
                window.alerting = false;
                None
            }
        };

        if let Some(alert) = alert {
            self.emit(alert).await;
        }
    }

    /// Records one connector failure cycle as a `connection_error` alert,
    /// escalating severity past the consecutive-failure threshold.
    pub async fn connection_failure(&self, failure: &ConnectionFailure) {
        let severity = if failure.unrecoverable
            || failure.consecutive_failures >= self.escalation_threshold
        {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        };

        let alert = Alert::new(
            severity,
            AlertCategory::ConnectionError,
            format!(
                "Feed connection failed: {}; retrying in {:?}",
                failure.reason, failure.next_retry_in
            ),
            json!({
                "consecutive_failures": failure.consecutive_failures,
                "next_retry_ms": failure.next_retry_in.as_millis() as u64,
                "unrecoverable": failure.unrecoverable,
            }),
        );
        self.emit(alert).await;
    }

    /// Appends an alert to the sink. A sink failure is logged; the
    /// ingestion path never stops over it.
    async fn emit(&self, alert: Alert) {
        tracing::warn!(severity = %alert.severity, category = %alert.category, message = %alert.message, "Raising alert.");
        if let Err(e) = self.sink.append(&alert).await {
            tracing::error!(error = %e, "Failed to append alert to the alert log.");
        }
    }
}
