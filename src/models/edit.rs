//! This module defines the `EditRecord` struct, the decoded form of one
//! accepted feed event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single edit event attributed to a watch-list entity.
///
/// Produced by the decoder from one raw feed payload and consumed once by
/// the aggregator and the alert monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRecord {
    /// Identifier of the watch-list entity this edit belongs to.
    pub entity_id: i64,

    /// Timestamp of the edit as reported by the feed, or the decode time
    /// when the feed omits it.
    pub timestamp: DateTime<Utc>,

    /// The editor reported by the feed, if any.
    pub editor: Option<String>,

    /// The free-text edit comment reported by the feed, if any.
    pub comment: Option<String>,
}
