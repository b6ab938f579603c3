//! The EventDecoder parses raw feed payloads and filters them against the
//! watch-list.

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use serde::Deserialize;

use crate::models::{EditRecord, Entity};

/// The wire shape of one recent-change event, with every field optional so
/// that partial payloads deserialize and can be classified as malformed.
#[derive(Debug, Deserialize)]
struct RawChangeEvent {
    title: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    user: Option<String>,
    comment: Option<String>,
    timestamp: Option<i64>,
}

/// Counters for payloads the decoder dropped, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderDrops {
    /// Payloads that were not valid JSON or were missing required fields.
    pub malformed: u64,
    /// Well-formed events of a non-edit type.
    pub other_type: u64,
    /// Edits to pages outside the watch-list.
    pub unwatched: u64,
}

/// Decodes raw payloads into `EditRecord`s, silently discarding feed noise.
///
/// Titles are matched by exact, case-sensitive equality against the
/// watch-list display names (the feed delivers canonical titles). Dropped
/// payloads are counted but never alerted.
pub struct EventDecoder {
    titles: HashMap<String, i64>,
    drops: DecoderDrops,
}

impl EventDecoder {
    /// Creates a decoder for the given watch-list.
    pub fn new(watchlist: &[Entity]) -> Self {
        let titles =
            watchlist.iter().map(|e| (e.display_name.clone(), e.id)).collect::<HashMap<_, _>>();
        Self { titles, drops: DecoderDrops::default() }
    }

    /// Decodes one raw payload, or returns `None` if it is malformed, not an
    /// edit, or not about a watch-list entity.
    pub fn decode(&mut self, payload: &str) -> Option<EditRecord> {
        let event: RawChangeEvent = match serde_json::from_str(payload) {
            Ok(event) => event,
            Err(e) => {
                self.drops.malformed += 1;
                tracing::trace!(error = %e, "Dropping unparseable payload.");
                return None;
            }
        };

        let (Some(title), Some(kind)) = (event.title, event.kind) else {
            self.drops.malformed += 1;
            return None;
        };
        if kind != "edit" {
            self.drops.other_type += 1;
            return None;
        }
        let Some(&entity_id) = self.titles.get(&title) else {
            self.drops.unwatched += 1;
            return None;
        };

        // The feed reports epoch seconds; fall back to the decode time when
        // the field is absent or out of range.
        let timestamp = event
            .timestamp
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(Utc::now);

        Some(EditRecord { entity_id, timestamp, editor: event.user, comment: event.comment })
    }

    /// Returns the drop counters accumulated so far.
    pub fn drops(&self) -> DecoderDrops {
        self.drops
    }
}
