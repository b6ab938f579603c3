//! Providers of raw event data for the ingestion pipeline.

pub mod sse;
pub mod traits;

pub use sse::SseStreamSource;
pub use traits::{EventSubscription, StreamSource, StreamSourceError};
