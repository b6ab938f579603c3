//! File-backed snapshot publisher: a tabular CSV and a structured JSON
//! document, both replaced atomically on every publish.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tempfile::NamedTempFile;

use super::{error::PersistenceError, traits::SnapshotPublisher};
use crate::models::Snapshot;

/// Fixed column order of the tabular metrics file.
const CSV_HEADERS: [&str; 5] =
    ["entity", "edit_count", "last_edit_timestamp", "last_editor", "last_comment"];

/// Edit comments are free text and can be very long; the tabular file keeps
/// a prefix only. The JSON snapshot carries the full comment.
const MAX_CSV_COMMENT_CHARS: usize = 200;

/// Publishes snapshots to a CSV file and a JSON file.
///
/// Each write goes to a temporary file in the target directory which is then
/// renamed over the destination, so a concurrent reader sees either the old
/// or the new snapshot, never a partial one.
pub struct FileSnapshotPublisher {
    csv_path: PathBuf,
    json_path: PathBuf,
}

impl FileSnapshotPublisher {
    /// Creates a publisher writing to the given destinations.
    pub fn new(csv_path: PathBuf, json_path: PathBuf) -> Self {
        Self { csv_path, json_path }
    }

    fn encode_csv(snapshot: &Snapshot) -> Result<Vec<u8>, PersistenceError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADERS)?;
        for record in &snapshot.records {
            writer.write_record([
                record.entity.clone(),
                record.edit_count.to_string(),
                record.last_edit_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                record.last_editor.clone().unwrap_or_default(),
                truncate_chars(record.last_comment.as_deref().unwrap_or(""), MAX_CSV_COMMENT_CHARS),
            ])?;
        }
        writer.into_inner().map_err(|e| PersistenceError::Io(e.into_error()))
    }
}

#[async_trait]
impl SnapshotPublisher for FileSnapshotPublisher {
    async fn publish(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let csv_bytes = Self::encode_csv(snapshot)?;
        let json_bytes = serde_json::to_vec_pretty(snapshot)?;

        write_atomic(&self.csv_path, &csv_bytes)?;
        write_atomic(&self.json_path, &json_bytes)?;
        tracing::trace!(csv = %self.csv_path.display(), json = %self.json_path.display(), "Snapshot published.");
        Ok(())
    }
}

/// Reads a structured snapshot back from disk.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, PersistenceError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Writes `bytes` to `path` via a temporary file and rename, so readers
/// never observe a partial file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| PersistenceError::Replace(e.to_string()))?;
    Ok(())
}

/// Truncates on a character boundary.
fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, MetricsRecord};
    use chrono::{TimeZone, Utc};

    fn sample_snapshot() -> Snapshot {
        let entities = Entity::watchlist(&["Elon Musk".to_string(), "Wikipedia".to_string()]);
        let mut records: Vec<MetricsRecord> =
            entities.iter().map(MetricsRecord::empty).collect();
        records[0].edit_count = 3;
        records[0].last_edit_at = Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        records[0].last_editor = Some("alice".to_string());
        records[0].last_comment = Some("typo fix".to_string());
        Snapshot { taken_at: Utc.timestamp_opt(1_700_000_100, 0).unwrap(), records }
    }

    fn publisher_in(dir: &Path) -> FileSnapshotPublisher {
        FileSnapshotPublisher::new(dir.join("metrics.csv"), dir.join("metrics_snapshot.json"))
    }

    #[tokio::test]
    async fn json_snapshot_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher_in(dir.path());
        let snapshot = sample_snapshot();

        publisher.publish(&snapshot).await.unwrap();
        let read_back = read_snapshot(&dir.path().join("metrics_snapshot.json")).unwrap();

        assert_eq!(read_back, snapshot);
    }

    #[tokio::test]
    async fn csv_has_fixed_columns_in_watchlist_order() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher_in(dir.path());

        publisher.publish(&sample_snapshot()).await.unwrap();
        let contents = std::fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "entity,edit_count,last_edit_timestamp,last_editor,last_comment");
        assert!(lines[1].starts_with("Elon Musk,3,"));
        assert!(lines[1].contains("alice"));
        assert!(lines[1].ends_with("typo fix"));
        assert_eq!(lines[2], "Wikipedia,0,,,");
    }

    #[tokio::test]
    async fn publish_rewrites_rather_than_appends() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher_in(dir.path());
        let mut snapshot = sample_snapshot();

        publisher.publish(&snapshot).await.unwrap();
        snapshot.records[0].edit_count = 4;
        publisher.publish(&snapshot).await.unwrap();

        let contents = std::fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.contains("Elon Musk,4,"));
        assert!(!contents.contains("Elon Musk,3,"));
    }

    #[tokio::test]
    async fn long_comments_are_truncated_in_the_csv_only() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher_in(dir.path());
        let mut snapshot = sample_snapshot();
        let long_comment = "é".repeat(300);
        snapshot.records[0].last_comment = Some(long_comment.clone());

        publisher.publish(&snapshot).await.unwrap();

        let contents = std::fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert!(contents.contains(&"é".repeat(200)));
        assert!(!contents.contains(&"é".repeat(201)));

        let read_back = read_snapshot(&dir.path().join("metrics_snapshot.json")).unwrap();
        assert_eq!(read_back.records[0].last_comment.as_deref(), Some(long_comment.as_str()));
    }

    #[tokio::test]
    async fn publish_to_a_missing_directory_fails_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does_not_exist");
        let publisher = publisher_in(&missing);

        let result = publisher.publish(&sample_snapshot()).await;
        assert!(result.is_err());
    }
}
