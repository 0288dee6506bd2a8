//! # Flatsheet - statistics store to spreadsheet export
//!
//! Reads per-user records from the desktop app's SQLite store and flattens
//! them into a single CSV table that spreadsheet tools open directly.
//!
//! Every record has a fixed identity (uid, name, update time) and a JSON
//! payload whose keys differ from user to user. The export holds one column
//! per key seen anywhere in the batch, well-known business columns first.
//!
//! ## Modules
//!
//! - **flatten**: parse payloads, merge rows, order columns, write CSV
//! - **store**: locate and read the SQLite store
//! - **config**: export settings
//!
//! ## Quick Start
//!
//! ```rust
//! use flatsheet::flatten::{ColumnOrder, RawRecord, RecordFlattener, RecordId, DEFAULT_PRIORITY};
//!
//! let records = vec![
//!     RawRecord::new(RecordId::new("u1")).with_name("Alice").with_payload(r#"{"GMV": 100}"#),
//!     RawRecord::new(RecordId::new("u2")).with_payload(r#"{"花费": 20}"#),
//! ];
//!
//! let batch = RecordFlattener::new().flatten_all(&records);
//! let order = ColumnOrder::resolve(&batch.universe, &DEFAULT_PRIORITY);
//!
//! assert_eq!(order.as_slice(), &["UID", "名称", "GMV", "花费", "更新时间"]);
//! ```

use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;
use tracing::info;

pub mod config;
pub mod error;
pub mod flatten;
pub mod store;

// Re-export commonly used types for convenience
pub use config::ExportConfig;
pub use error::{ExportError, ExportResult};
pub use flatten::{ColumnOrder, FieldUniverse, FlatRow, RawRecord, RecordFlattener};
pub use store::{locate_store, StoreReader};

/// How an export run ended, when it did not fail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExportOutcome {
    /// A file was written
    Written {
        path: PathBuf,
        rows: usize,
        columns: usize,
    },
    /// The store had no records; no file was created
    NothingToExport,
}

/// Main entry point: locate the store, load it and write the export
pub fn export_store(config: &ExportConfig) -> ExportResult<ExportOutcome> {
    let path = locate_store(config)?;

    let records = {
        let reader = StoreReader::open(&path)?;
        reader.load_records()?
    };

    export_records(&records, config, &config.now())
}

/// Flatten `records` and write them as one table
pub fn export_records<Tz>(
    records: &[RawRecord],
    config: &ExportConfig,
    generated_at: &DateTime<Tz>,
) -> ExportResult<ExportOutcome>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if records.is_empty() {
        info!("no records in store");
        return Ok(ExportOutcome::NothingToExport);
    }

    let flattener = match config.utc_offset {
        Some(offset) => RecordFlattener::with_utc_offset(offset),
        None => RecordFlattener::new(),
    };
    let batch = flattener.flatten_all(records);
    let order = ColumnOrder::resolve(&batch.universe, config.priority.as_slice());
    info!(rows = batch.len(), columns = order.len(), "flattened records");

    let path = flatten::write_export(&batch, &order, config, generated_at)?;
    info!(path = %path.display(), "export written");

    Ok(ExportOutcome::Written {
        path,
        rows: batch.len(),
        columns: order.len(),
    })
}
