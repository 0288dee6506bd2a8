//! Record flattening - turn schema-less records into one uniform table
//!
//! Each record's payload is parsed into dynamic fields and merged with the
//! fixed identity columns. The union of every column seen is accumulated in a
//! [`FieldUniverse`], from which a deterministic [`ColumnOrder`] is resolved
//! once all rows are known. [`TableWriter`] then serializes the rows against
//! that order.

pub mod types;
pub mod extractor;
pub mod columns;
pub mod writer;

pub use types::{
    FieldUniverse, FlatRow, FlattenedBatch, PayloadFields, RawRecord, RawTimestamp, RecordId,
    UpdateTime, FIXED_COLUMNS, NAME_COLUMN, RAW_DATA_FIELD, UID_COLUMN, UPDATED_AT_COLUMN,
};
pub use extractor::{parse_payload, RecordFlattener};
pub use columns::{ColumnOrder, DEFAULT_PRIORITY};
pub use writer::{write_export, write_table, TableWriter, UTF8_BOM};
