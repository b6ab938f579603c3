//! Data models for anomaly alerts.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How serious an alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    /// Informational, no action required.
    Info,
    /// Degraded but self-recovering condition.
    Warning,
    /// Persistent or unrecoverable condition.
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "INFO"),
            AlertSeverity::Warning => write!(f, "WARNING"),
            AlertSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// The kind of anomaly an alert reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    /// The feed connection failed or was rejected.
    ConnectionError,
    /// An entity's edit rate exceeded the configured threshold.
    RateAnomaly,
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertCategory::ConnectionError => write!(f, "connection_error"),
            AlertCategory::RateAnomaly => write!(f, "rate_anomaly"),
        }
    }
}

/// A single anomaly alert. Immutable once written to the alert log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// When the alert was raised.
    pub timestamp: DateTime<Utc>,

    /// Severity of the alert.
    pub severity: AlertSeverity,

    /// Category of the alert.
    pub category: AlertCategory,

    /// Human-readable description of the anomaly.
    pub message: String,

    /// Structured context for the anomaly (counts, delays, etc).
    pub context: serde_json::Value,
}

impl Alert {
    /// Creates a new alert timestamped now.
    pub fn new(
        severity: AlertSeverity,
        category: AlertCategory,
        message: String,
        context: serde_json::Value,
    ) -> Self {
        Self { timestamp: Utc::now(), severity, category, message, context }
    }

    /// Renders the alert as one line for the append-only alert log.
    pub fn format_line(&self) -> String {
        format!(
            "[{}] {} {}: {} {}",
            self.timestamp.to_rfc3339(),
            self.severity,
            self.category,
            self.message,
            self.context
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_line_contains_all_fields() {
        let alert = Alert::new(
            AlertSeverity::Warning,
            AlertCategory::RateAnomaly,
            "'Elon Musk' had 7 edits in the last 60s".to_string(),
            json!({ "count": 7 }),
        );
        let line = alert.format_line();

        assert!(line.contains("WARNING"));
        assert!(line.contains("rate_anomaly"));
        assert!(line.contains("'Elon Musk' had 7 edits in the last 60s"));
        assert!(line.contains(r#""count":7"#));
        assert!(!line.contains('\n'));
    }
}
