use crate::flatten::types::{
    FieldUniverse, FlatRow, FlattenedBatch, PayloadFields, RawRecord, RawTimestamp, UpdateTime,
    NAME_COLUMN, UID_COLUMN, UPDATED_AT_COLUMN,
};
use chrono::{DateTime, Datelike, FixedOffset, Local, Utc};
use serde_json::Value;
use tracing::{debug, warn};

/// Format of the rendered update time
pub const UPDATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Flattens raw store records into rows placed against a shared field universe
#[derive(Debug, Clone, Default)]
pub struct RecordFlattener {
    /// Offset used to render timestamps; local time when unset
    utc_offset: Option<FixedOffset>,
}

impl RecordFlattener {
    pub fn new() -> Self {
        RecordFlattener { utc_offset: None }
    }

    /// Render timestamps at a fixed offset instead of the machine's local zone
    pub fn with_utc_offset(offset: FixedOffset) -> Self {
        RecordFlattener {
            utc_offset: Some(offset),
        }
    }

    /// Flatten every record, accumulating the universe as we go
    pub fn flatten_all(&self, records: &[RawRecord]) -> FlattenedBatch {
        let mut universe = FieldUniverse::new();
        let rows = records
            .iter()
            .map(|record| self.flatten(record, &mut universe))
            .collect();

        FlattenedBatch { rows, universe }
    }

    /// Flatten one record into a row, adding its columns to `universe`.
    ///
    /// Never fails: a malformed payload or timestamp degrades to fallback text.
    /// Payload keys are merged after the fixed columns, so a payload key named
    /// like a fixed column replaces the fixed value in this row.
    pub fn flatten(&self, record: &RawRecord, universe: &mut FieldUniverse) -> FlatRow {
        let mut row = FlatRow::new();

        let name = record
            .display_name
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null);

        let update_time = self.format_update_time(record.updated_at.as_ref());
        if let UpdateTime::Raw(raw) = &update_time {
            warn!(uid = %record.id, raw = %raw, "update time is not a usable millisecond timestamp, keeping it as text");
        }

        place(&mut row, universe, UID_COLUMN, record.id.to_value());
        place(&mut row, universe, NAME_COLUMN, name);
        place(&mut row, universe, UPDATED_AT_COLUMN, Value::String(update_time.into_text()));

        let payload = parse_payload(record.payload.as_deref());
        match &payload {
            PayloadFields::Fallback(_) => {
                warn!(uid = %record.id, "payload is not a JSON object, keeping the raw text");
            }
            PayloadFields::Parsed(fields) => {
                debug!(uid = %record.id, fields = fields.len(), "parsed payload");
            }
            PayloadFields::Empty => {}
        }

        for (key, value) in payload.into_fields() {
            place(&mut row, universe, &key, value);
        }

        row
    }

    /// Convert a millisecond timestamp into display text
    pub fn format_update_time(&self, raw: Option<&RawTimestamp>) -> UpdateTime {
        let Some(raw) = raw else {
            return UpdateTime::Absent;
        };

        let millis = match raw {
            RawTimestamp::Millis(0) => return UpdateTime::Absent,
            RawTimestamp::Millis(ms) => *ms,
            RawTimestamp::FractionalMillis(ms) if *ms == 0.0 => return UpdateTime::Absent,
            RawTimestamp::FractionalMillis(ms) => {
                if !ms.is_finite() || ms.abs() >= i64::MAX as f64 {
                    return UpdateTime::Raw(raw.to_string());
                }
                ms.trunc() as i64
            }
            RawTimestamp::Text(text) if text.is_empty() => return UpdateTime::Absent,
            RawTimestamp::Text(text) => return UpdateTime::Raw(text.clone()),
        };

        match DateTime::<Utc>::from_timestamp_millis(millis) {
            Some(instant) => match self.render(instant) {
                Some(text) => UpdateTime::Formatted(text),
                None => UpdateTime::Raw(raw.to_string()),
            },
            None => UpdateTime::Raw(raw.to_string()),
        }
    }

    /// Four-digit years only; anything else is treated as out of range
    fn render(&self, instant: DateTime<Utc>) -> Option<String> {
        let local = match self.utc_offset {
            Some(offset) => instant.with_timezone(&offset),
            None => instant.with_timezone(&Local).fixed_offset(),
        };

        if !(1..=9999).contains(&local.year()) {
            return None;
        }

        Some(local.format(UPDATE_TIME_FORMAT).to_string())
    }
}

/// Parse a payload document into its dynamic fields
pub fn parse_payload(payload: Option<&str>) -> PayloadFields {
    let Some(text) = payload.filter(|text| !text.is_empty()) else {
        return PayloadFields::Empty;
    };

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(fields)) => PayloadFields::Parsed(fields),
        Ok(Value::Null) => PayloadFields::Empty,
        Ok(_) | Err(_) => PayloadFields::Fallback(text.to_string()),
    }
}

fn place(row: &mut FlatRow, universe: &mut FieldUniverse, column: &str, value: Value) {
    universe.insert(column);
    row.insert(column, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::types::{RecordId, RAW_DATA_FIELD};
    use serde_json::json;

    fn beijing() -> RecordFlattener {
        RecordFlattener::with_utc_offset(FixedOffset::east_opt(8 * 3600).unwrap())
    }

    #[test]
    fn test_payload_fields_become_columns() {
        let record = RawRecord::new(RecordId::new("u1"))
            .with_name("Alice")
            .with_payload(r#"{"GMV": 100, "花费": 20}"#)
            .with_updated_at(RawTimestamp::Millis(1_700_000_000_000));

        let mut universe = FieldUniverse::new();
        let row = beijing().flatten(&record, &mut universe);

        assert_eq!(row.get(UID_COLUMN).unwrap(), "u1");
        assert_eq!(row.get(NAME_COLUMN).unwrap(), "Alice");
        assert_eq!(row.get("GMV").unwrap(), &json!(100));
        assert_eq!(row.get("花费").unwrap(), &json!(20));
        assert_eq!(row.get(UPDATED_AT_COLUMN).unwrap(), "2023-11-15 06:13:20");

        assert_eq!(universe.len(), 5);
        for column in row.columns() {
            assert!(universe.contains(column));
        }
    }

    #[test]
    fn test_null_payload_keeps_only_fixed_columns() {
        let record = RawRecord::new(RecordId::new("u2"));
        let mut universe = FieldUniverse::new();
        let row = RecordFlattener::new().flatten(&record, &mut universe);

        assert_eq!(row.len(), 3);
        assert_eq!(universe.len(), 3);
        assert_eq!(row.cell_text(NAME_COLUMN), "");
        assert_eq!(row.cell_text(UPDATED_AT_COLUMN), "");
    }

    #[test]
    fn test_malformed_payload_falls_back_to_raw_text() {
        let record = RawRecord::new(RecordId::new("u3")).with_payload("not json");
        let mut universe = FieldUniverse::new();
        let row = RecordFlattener::new().flatten(&record, &mut universe);

        assert_eq!(row.get(RAW_DATA_FIELD).unwrap(), "not json");
        assert_eq!(universe.len(), 4);
        assert!(universe.contains(RAW_DATA_FIELD));
    }

    #[test]
    fn test_parse_payload_variants() {
        assert_eq!(parse_payload(None), PayloadFields::Empty);
        assert_eq!(parse_payload(Some("")), PayloadFields::Empty);
        assert_eq!(parse_payload(Some("null")), PayloadFields::Empty);
        assert_eq!(
            parse_payload(Some("[1, 2]")),
            PayloadFields::Fallback("[1, 2]".to_string())
        );
        assert!(matches!(parse_payload(Some(r#"{"a": 1}"#)), PayloadFields::Parsed(_)));
    }

    #[test]
    fn test_payload_key_overwrites_fixed_column() {
        let record = RawRecord::new(RecordId::new("u4"))
            .with_name("Alice")
            .with_payload(r#"{"名称": "Override"}"#);
        let mut universe = FieldUniverse::new();
        let row = RecordFlattener::new().flatten(&record, &mut universe);

        assert_eq!(row.get(NAME_COLUMN).unwrap(), "Override");
        assert_eq!(universe.len(), 3);
    }

    #[test]
    fn test_update_time_fallbacks() {
        let flattener = beijing();
        assert_eq!(flattener.format_update_time(None), UpdateTime::Absent);
        assert_eq!(
            flattener.format_update_time(Some(&RawTimestamp::Millis(0))),
            UpdateTime::Absent
        );
        assert_eq!(
            flattener.format_update_time(Some(&RawTimestamp::Text("yesterday".into()))),
            UpdateTime::Raw("yesterday".to_string())
        );
        assert_eq!(
            flattener.format_update_time(Some(&RawTimestamp::Millis(i64::MAX))),
            UpdateTime::Raw(i64::MAX.to_string())
        );
        assert_eq!(
            flattener.format_update_time(Some(&RawTimestamp::FractionalMillis(f64::NAN))),
            UpdateTime::Raw("NaN".to_string())
        );
        assert_eq!(
            flattener.format_update_time(Some(&RawTimestamp::FractionalMillis(1_700_000_000_000.9))),
            UpdateTime::Formatted("2023-11-15 06:13:20".to_string())
        );
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let record = RawRecord::new(RecordId::Integer(7))
            .with_payload(r#"{"roi": 2.5, "订单数": 3}"#)
            .with_updated_at(RawTimestamp::Millis(1_700_000_000_000));
        let flattener = beijing();

        let first = flattener.flatten(&record, &mut FieldUniverse::new());
        let second = flattener.flatten(&record, &mut FieldUniverse::new());
        assert_eq!(first, second);
    }

    #[test]
    fn test_flatten_all_keeps_every_record() {
        let records = vec![
            RawRecord::new(RecordId::new("a")).with_payload(r#"{"A": 1}"#),
            RawRecord::new(RecordId::new("b")).with_payload("{broken"),
            RawRecord::new(RecordId::new("c")),
            RawRecord::new(RecordId::new("d")).with_payload(r#"{"B": 2}"#),
        ];

        let batch = RecordFlattener::new().flatten_all(&records);
        assert_eq!(batch.len(), records.len());
        assert!(batch.universe.contains("A"));
        assert!(batch.universe.contains("B"));
        assert!(batch.universe.contains(RAW_DATA_FIELD));
        assert_eq!(batch.rows[0].get("B"), None);
        assert_eq!(batch.rows[3].get("A"), None);
    }
}
