//! This module contains the data models for the wikiwatch application.

pub mod alert;
pub mod edit;
pub mod entity;
pub mod metrics;

pub use alert::{Alert, AlertCategory, AlertSeverity};
pub use edit::EditRecord;
pub use entity::Entity;
pub use metrics::{MetricsRecord, Snapshot};
