//! The MetricsAggregator owns the per-entity metrics table and publishes a
//! snapshot after every mutation.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;

use crate::{
    models::{EditRecord, Entity, MetricsRecord, Snapshot},
    persistence::traits::SnapshotPublisher,
};

/// The single owner of the mutable metrics state.
///
/// All mutation goes through `apply`, which is serialized by exclusive
/// ownership: the aggregator lives on one pipeline task and is never shared.
/// A publish failure is logged and the in-memory state stays authoritative;
/// the next publish retries the write.
pub struct MetricsAggregator<P: SnapshotPublisher + ?Sized> {
    /// One record per watch-list entity, in watch-list order.
    records: Vec<MetricsRecord>,
    /// Entity id to position in `records`.
    index: HashMap<i64, usize>,
    /// The publisher invoked after every mutation.
    publisher: Arc<P>,
}

impl<P: SnapshotPublisher + ?Sized> MetricsAggregator<P> {
    /// Creates an aggregator with a zeroed record for every watch-list
    /// entity.
    pub fn new(watchlist: &[Entity], publisher: Arc<P>) -> Self {
        let records: Vec<MetricsRecord> = watchlist.iter().map(MetricsRecord::empty).collect();
        let index = records.iter().enumerate().map(|(i, r)| (r.entity_id, i)).collect();
        Self { records, index, publisher }
    }

    /// Publishes the initial zeroed snapshot. Called once before the
    /// connector starts delivering events, so a valid snapshot exists even
    /// if the feed never delivers.
    pub async fn bootstrap(&self) {
        tracing::info!(entities = self.records.len(), "Publishing bootstrap snapshot.");
        self.publish().await;
    }

    /// Applies one edit record and publishes the updated snapshot. Returns
    /// the updated record, or `None` for an unknown entity id.
    pub async fn apply(&mut self, record: &EditRecord) -> Option<MetricsRecord> {
        let Some(&idx) = self.index.get(&record.entity_id) else {
            tracing::warn!(entity_id = record.entity_id, "Edit record for unknown entity id.");
            return None;
        };
        self.records[idx].apply(record);
        let updated = self.records[idx].clone();
        self.publish().await;
        Some(updated)
    }

    /// Returns the current state of all records, in watch-list order.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot { taken_at: Utc::now(), records: self.records.clone() }
    }

    /// Writes the current snapshot through the publisher. Failures are
    /// logged, never propagated into the ingestion loop.
    pub async fn publish(&self) {
        if let Err(e) = self.publisher.publish(&self.snapshot()).await {
            tracing::error!(error = %e, "Failed to publish metrics snapshot; state kept in memory.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{error::PersistenceError, traits::MockSnapshotPublisher};
    use chrono::{TimeZone, Utc};

    fn watchlist() -> Vec<Entity> {
        Entity::watchlist(&["Elon Musk".to_string(), "Wikipedia".to_string()])
    }

    fn edit(entity_id: i64, editor: &str, comment: &str) -> EditRecord {
        EditRecord {
            entity_id,
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            editor: Some(editor.to_string()),
            comment: Some(comment.to_string()),
        }
    }

    #[tokio::test]
    async fn bootstrap_publishes_a_zeroed_snapshot_for_every_entity() {
        let mut publisher = MockSnapshotPublisher::new();
        publisher
            .expect_publish()
            .times(1)
            .withf(|snapshot| {
                snapshot.records.len() == 2
                    && snapshot.records.iter().all(|r| r.edit_count == 0 && r.last_editor.is_none())
            })
            .returning(|_| Ok(()));

        let aggregator = MetricsAggregator::new(&watchlist(), Arc::new(publisher));
        aggregator.bootstrap().await;

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.records[0].entity, "Elon Musk");
        assert_eq!(snapshot.records[1].entity, "Wikipedia");
    }

    #[tokio::test]
    async fn n_applies_yield_count_n_with_last_writer_wins_fields() {
        let mut publisher = MockSnapshotPublisher::new();
        publisher.expect_publish().times(3).returning(|_| Ok(()));

        let mut aggregator = MetricsAggregator::new(&watchlist(), Arc::new(publisher));
        for i in 0..3 {
            let updated = aggregator
                .apply(&edit(0, &format!("editor{i}"), &format!("comment{i}")))
                .await
                .expect("known entity");
            assert_eq!(updated.edit_count, i + 1);
        }

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.records[0].edit_count, 3);
        assert_eq!(snapshot.records[0].last_editor.as_deref(), Some("editor2"));
        assert_eq!(snapshot.records[0].last_comment.as_deref(), Some("comment2"));
        // The other entity is untouched.
        assert_eq!(snapshot.records[1].edit_count, 0);
    }

    #[tokio::test]
    async fn unknown_entity_is_a_no_op_and_does_not_publish() {
        let mut publisher = MockSnapshotPublisher::new();
        publisher.expect_publish().times(0);

        let mut aggregator = MetricsAggregator::new(&watchlist(), Arc::new(publisher));
        assert!(aggregator.apply(&edit(99, "alice", "x")).await.is_none());
        assert_eq!(aggregator.snapshot().records[0].edit_count, 0);
    }

    #[tokio::test]
    async fn publish_failure_keeps_state_and_does_not_propagate() {
        let mut publisher = MockSnapshotPublisher::new();
        publisher.expect_publish().returning(|_| {
            Err(PersistenceError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only filesystem",
            )))
        });

        let mut aggregator = MetricsAggregator::new(&watchlist(), Arc::new(publisher));
        let updated = aggregator.apply(&edit(0, "alice", "typo fix")).await.expect("known entity");

        assert_eq!(updated.edit_count, 1);
        assert_eq!(aggregator.snapshot().records[0].edit_count, 1);
    }
}
