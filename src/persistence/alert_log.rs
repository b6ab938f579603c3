//! File-backed, append-only alert log.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::PathBuf,
    sync::Mutex,
};

use async_trait::async_trait;

use super::{error::PersistenceError, traits::AlertSink};
use crate::models::Alert;

/// Appends alerts as single lines to a log file.
///
/// The file is opened in append mode and never truncated; restarting the
/// process resumes appending to the existing log.
pub struct FileAlertSink {
    file: Mutex<File>,
}

impl FileAlertSink {
    /// Opens (or creates) the alert log at the given path.
    pub fn open(path: PathBuf) -> Result<Self, PersistenceError> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { file: Mutex::new(file) })
    }
}

#[async_trait]
impl AlertSink for FileAlertSink {
    async fn append(&self, alert: &Alert) -> Result<(), PersistenceError> {
        let line = alert.format_line();
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertCategory, AlertSeverity};
    use serde_json::json;

    fn alert(message: &str) -> Alert {
        Alert::new(
            AlertSeverity::Warning,
            AlertCategory::ConnectionError,
            message.to_string(),
            json!({}),
        )
    }

    #[tokio::test]
    async fn appends_one_line_per_alert() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.log");
        let sink = FileAlertSink::open(path.clone()).unwrap();

        sink.append(&alert("first")).await.unwrap();
        sink.append(&alert("second")).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("first"));
        assert!(lines[1].contains("second"));
    }

    #[tokio::test]
    async fn reopening_appends_instead_of_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.log");

        {
            let sink = FileAlertSink::open(path.clone()).unwrap();
            sink.append(&alert("before restart")).await.unwrap();
        }
        let sink = FileAlertSink::open(path.clone()).unwrap();
        sink.append(&alert("after restart")).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("before restart"));
        assert!(contents.contains("after restart"));
    }
}
