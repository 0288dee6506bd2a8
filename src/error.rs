//! Error types for flatsheet
//!
//! Only store-level and output-level problems are errors. A malformed payload
//! or timestamp on a single record is recovered inside the flattener and never
//! surfaces here.

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can abort an export
#[derive(Error, Debug)]
pub enum ExportError {
    /// No store file at any of the candidate locations
    #[error("Store '{file_name}' not found (searched: {})", join_paths(.searched))]
    SourceNotFound {
        file_name: String,
        searched: Vec<PathBuf>,
    },

    /// The store opened but the expected table or columns are missing
    #[error("Store '{path}' has no usable `{table}` table: {reason}")]
    SchemaMismatch {
        path: PathBuf,
        table: String,
        reason: String,
    },

    /// Any other SQLite failure
    #[error("SQLite error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Failed to encode a CSV record
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O errors (staging file, flushing, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The finished export could not be moved into place
    #[error("Failed to save export to '{path}': {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Something the operator can do about it, when there is something
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ExportError::SourceNotFound { .. } => {
                Some("Run from the folder containing app_data.db, or pass --db <PATH>.")
            }
            ExportError::SchemaMismatch { .. } => Some(
                "The store was found but is not the statistics database. The older account \
                 database (Sqlite3.db) keeps its rows in `Mysqlks`, not `user_stats`.",
            ),
            _ => None,
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nowhere".to_string();
    }
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for ExportError
pub type ExportResult<T> = std::result::Result<T, ExportError>;
