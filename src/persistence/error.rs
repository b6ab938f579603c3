//! This module contains the error types for the persistence layer.

use thiserror::Error;

/// Errors that can occur while writing metrics files or the alert log.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// An I/O operation on an output file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot could not be encoded as JSON.
    #[error("Failed to encode snapshot as JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The snapshot could not be encoded as CSV.
    #[error("Failed to encode snapshot as CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The atomic replace of an output file failed.
    #[error("Failed to replace output file: {0}")]
    Replace(String),
}
