use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Column holding the record identifier
pub const UID_COLUMN: &str = "UID";

/// Column holding the display name
pub const NAME_COLUMN: &str = "名称";

/// Column holding the formatted update time
pub const UPDATED_AT_COLUMN: &str = "更新时间";

/// Dynamic field used when a payload cannot be merged key by key
pub const RAW_DATA_FIELD: &str = "raw_data";

/// The columns every flattened row carries, whatever its payload
pub const FIXED_COLUMNS: [&str; 3] = [UID_COLUMN, NAME_COLUMN, UPDATED_AT_COLUMN];

/// Identifier of a source record, kept in the type it was stored with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        RecordId::Text(id.into())
    }

    /// The cell value for the `UID` column
    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Integer(i) => Value::from(*i),
            RecordId::Real(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
            RecordId::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Integer(i) => write!(f, "{}", i),
            RecordId::Real(r) => write!(f, "{}", r),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

/// Update timestamp as found in the store, before any conversion
#[derive(Debug, Clone, PartialEq)]
pub enum RawTimestamp {
    /// Milliseconds since the Unix epoch
    Millis(i64),
    /// Milliseconds stored as a real number
    FractionalMillis(f64),
    /// Anything stored as text
    Text(String),
}

impl fmt::Display for RawTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawTimestamp::Millis(ms) => write!(f, "{}", ms),
            RawTimestamp::FractionalMillis(ms) => write!(f, "{}", ms),
            RawTimestamp::Text(s) => f.write_str(s),
        }
    }
}

/// One row read from the store: fixed identity plus the raw payload text
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub id: RecordId,
    pub display_name: Option<String>,
    pub payload: Option<String>,
    pub updated_at: Option<RawTimestamp>,
}

impl RawRecord {
    pub fn new(id: RecordId) -> Self {
        RawRecord {
            id,
            display_name: None,
            payload: None,
            updated_at: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_updated_at(mut self, updated_at: RawTimestamp) -> Self {
        self.updated_at = Some(updated_at);
        self
    }
}

/// Outcome of parsing one record's payload
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadFields {
    /// No payload, an empty string, or a JSON `null`
    Empty,
    /// A JSON object whose keys become columns
    Parsed(Map<String, Value>),
    /// Text that could not be merged; kept verbatim under [`RAW_DATA_FIELD`]
    Fallback(String),
}

impl PayloadFields {
    pub fn into_fields(self) -> Map<String, Value> {
        match self {
            PayloadFields::Empty => Map::new(),
            PayloadFields::Parsed(fields) => fields,
            PayloadFields::Fallback(raw) => {
                let mut fields = Map::new();
                fields.insert(RAW_DATA_FIELD.to_string(), Value::String(raw));
                fields
            }
        }
    }
}

/// Outcome of rendering one record's update timestamp
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateTime {
    Absent,
    /// `YYYY-MM-DD HH:MM:SS` in the export's time zone
    Formatted(String),
    /// The stored value, verbatim, because it could not be converted
    Raw(String),
}

impl UpdateTime {
    pub fn into_text(self) -> String {
        match self {
            UpdateTime::Absent => String::new(),
            UpdateTime::Formatted(text) | UpdateTime::Raw(text) => text,
        }
    }
}

/// A flattened record: column name to scalar value.
///
/// A column missing from the row is not an error; it renders as a blank cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatRow {
    cells: Map<String, Value>,
}

impl FlatRow {
    pub fn new() -> Self {
        FlatRow::default()
    }

    /// Set a cell, replacing any earlier value for the same column
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.cells.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Text for one cell of the delimited output
    pub fn cell_text(&self, column: &str) -> String {
        self.cells.get(column).map(render_cell).unwrap_or_default()
    }
}

/// Render a JSON value as the text of a single cell
pub fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Every column name seen across a batch. Append-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUniverse {
    names: BTreeSet<String>,
}

impl FieldUniverse {
    /// A universe seeded with the fixed columns
    pub fn new() -> Self {
        FieldUniverse {
            names: FIXED_COLUMNS.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn insert(&mut self, name: &str) {
        if !self.names.contains(name) {
            self.names.insert(name.to_string());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Union with a universe accumulated elsewhere
    pub fn merge(&mut self, other: FieldUniverse) {
        self.names.extend(other.names);
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in lexicographic order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for FieldUniverse {
    fn default() -> Self {
        FieldUniverse::new()
    }
}

/// All rows of a batch together with the universe they were placed in
#[derive(Debug, Clone, Default)]
pub struct FlattenedBatch {
    pub rows: Vec<FlatRow>,
    pub universe: FieldUniverse,
}

impl FlattenedBatch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
