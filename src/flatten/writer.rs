use crate::config::ExportConfig;
use crate::error::{ExportError, ExportResult};
use crate::flatten::columns::ColumnOrder;
use crate::flatten::types::{FlatRow, FlattenedBatch};
use chrono::{DateTime, TimeZone};
use std::collections::HashMap;
use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// UTF-8 byte-order mark; spreadsheet tools use it to pick the encoding
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes flattened rows as BOM-prefixed, comma-delimited text
pub struct TableWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> TableWriter<W> {
    /// Wrap `writer`, emitting the byte-order mark immediately
    pub fn new(mut writer: W) -> ExportResult<Self> {
        writer.write_all(UTF8_BOM)?;
        Ok(TableWriter {
            inner: csv::WriterBuilder::new().from_writer(writer),
        })
    }

    pub fn write_header(
        &mut self,
        order: &ColumnOrder,
        labels: &HashMap<String, String>,
    ) -> ExportResult<()> {
        self.inner.write_record(order.header(labels))?;
        Ok(())
    }

    pub fn write_row(&mut self, order: &ColumnOrder, row: &FlatRow) -> ExportResult<()> {
        self.inner.write_record(order.project(row))?;
        Ok(())
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(self) -> ExportResult<W> {
        self.inner
            .into_inner()
            .map_err(|e| ExportError::Io(e.into_error()))
    }
}

/// Write header and rows of `batch` to `writer` in `order`
pub fn write_table<W: Write>(
    writer: W,
    batch: &FlattenedBatch,
    order: &ColumnOrder,
    labels: &HashMap<String, String>,
) -> ExportResult<W> {
    let mut table = TableWriter::new(writer)?;
    table.write_header(order, labels)?;
    for row in &batch.rows {
        table.write_row(order, row)?;
    }
    table.into_inner()
}

/// `<prefix>_<YYYYmmdd_HHMMSS>.csv`
pub fn export_file_name<Tz>(prefix: &str, generated_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("{}_{}.csv", prefix, generated_at.format("%Y%m%d_%H%M%S"))
}

/// Write `batch` into a new file under `config.output_dir`.
///
/// The table is staged in a temporary file in the same directory and renamed
/// into place once complete, so a failed run leaves nothing behind.
pub fn write_export<Tz>(
    batch: &FlattenedBatch,
    order: &ColumnOrder,
    config: &ExportConfig,
    generated_at: &DateTime<Tz>,
) -> ExportResult<PathBuf>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let dir: &Path = &config.output_dir;
    let target = dir.join(export_file_name(&config.file_prefix, generated_at));

    std::fs::create_dir_all(dir)?;
    let mut staging = tempfile::Builder::new()
        .prefix(".flatsheet-")
        .suffix(".csv.tmp")
        .tempfile_in(dir)?;
    debug!(staging = %staging.path().display(), "staging export");

    {
        let file = write_table(staging.as_file_mut(), batch, order, &config.header_labels)?;
        file.flush()?;
    }
    staging.as_file().sync_all()?;

    staging
        .persist(&target)
        .map_err(|e| ExportError::Persist {
            path: target.clone(),
            source: e.error,
        })?;

    Ok(target)
}
