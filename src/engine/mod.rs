//! The wikiwatch engine: the services that turn the raw feed into metrics
//! and alerts.

pub mod aggregator;
pub mod alert_monitor;
pub mod connector;
pub mod decoder;
pub mod pipeline;

pub use aggregator::MetricsAggregator;
pub use alert_monitor::AlertMonitor;
pub use connector::{ConnectionFailure, StreamConnector};
pub use decoder::{DecoderDrops, EventDecoder};
pub use pipeline::EditPipeline;
