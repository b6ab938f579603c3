//! Data models for per-entity metrics and full-state snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{edit::EditRecord, entity::Entity};

/// The running metrics for a single watch-list entity.
///
/// One record exists per entity for the process lifetime. `edit_count` is
/// monotonically non-decreasing; the `last_*` fields reflect the most
/// recently applied edit in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Identifier of the entity this record belongs to.
    pub entity_id: i64,

    /// Display name of the entity.
    pub entity: String,

    /// Total number of edits applied since startup.
    pub edit_count: u64,

    /// Timestamp of the most recently applied edit.
    pub last_edit_at: Option<DateTime<Utc>>,

    /// Editor of the most recently applied edit.
    pub last_editor: Option<String>,

    /// Comment of the most recently applied edit.
    pub last_comment: Option<String>,
}

impl MetricsRecord {
    /// Creates an empty record for an entity, as produced at bootstrap.
    pub fn empty(entity: &Entity) -> Self {
        Self {
            entity_id: entity.id,
            entity: entity.display_name.clone(),
            edit_count: 0,
            last_edit_at: None,
            last_editor: None,
            last_comment: None,
        }
    }

    /// Applies one edit to this record: increments the counter and
    /// overwrites the `last_*` fields (last-arrived wins).
    pub fn apply(&mut self, record: &EditRecord) {
        self.edit_count += 1;
        self.last_edit_at = Some(record.timestamp);
        self.last_editor = record.editor.clone();
        self.last_comment = record.comment.clone();
    }
}

/// A complete, consistent copy of all per-entity metrics at one instant,
/// ordered by watch-list position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,

    /// One record per watch-list entity, in watch-list order.
    pub records: Vec<MetricsRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_overwrites_last_fields_and_increments_count() {
        let entity = Entity { id: 0, display_name: "Elon Musk".to_string() };
        let mut record = MetricsRecord::empty(&entity);
        assert_eq!(record.edit_count, 0);

        let ts = Utc::now();
        record.apply(&EditRecord {
            entity_id: 0,
            timestamp: ts,
            editor: Some("alice".to_string()),
            comment: Some("typo fix".to_string()),
        });
        record.apply(&EditRecord {
            entity_id: 0,
            timestamp: ts,
            editor: Some("bob".to_string()),
            comment: None,
        });

        assert_eq!(record.edit_count, 2);
        assert_eq!(record.last_editor.as_deref(), Some("bob"));
        assert_eq!(record.last_comment, None);
        assert_eq!(record.last_edit_at, Some(ts));
    }
}
