//! Durable outputs: metrics snapshots and the append-only alert log.

pub mod alert_log;
pub mod error;
pub mod snapshot;
pub mod traits;

pub use alert_log::FileAlertSink;
pub use error::PersistenceError;
pub use snapshot::{read_snapshot, FileSnapshotPublisher};
pub use traits::{AlertSink, SnapshotPublisher};
