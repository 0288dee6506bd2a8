use crate::error::{ExportError, ExportResult};
use crate::flatten::types::{RawRecord, RawTimestamp, RecordId};
use crate::store::schema::{SELECT_USER_STATS, USER_STATS_TABLE};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Read-only handle on the statistics store.
///
/// The connection closes when the reader is dropped, on every exit path.
pub struct StoreReader {
    conn: Connection,
    path: PathBuf,
}

impl StoreReader {
    /// Open the store at `path` without write access
    pub fn open<P: AsRef<Path>>(path: P) -> ExportResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        info!(path = %path.display(), "opened store");

        Ok(StoreReader { conn, path })
    }

    /// Wrap an already open connection, e.g. an in-memory database
    pub fn from_connection(conn: Connection) -> Self {
        StoreReader {
            conn,
            path: PathBuf::from(":memory:"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the fixed projection over `user_stats`
    pub fn load_records(&self) -> ExportResult<Vec<RawRecord>> {
        let mut stmt = self
            .conn
            .prepare(SELECT_USER_STATS)
            .map_err(|e| self.classify(e))?;

        let rows = stmt.query_map([], |row| {
            Ok(RawRecord {
                id: decode_id(row.get_ref(0)?),
                display_name: decode_text(row.get_ref(1)?),
                payload: decode_text(row.get_ref(2)?),
                updated_at: decode_timestamp(row.get_ref(3)?),
            })
        })?;

        let records = rows.collect::<Result<Vec<_>, _>>()?;
        info!(count = records.len(), "loaded records");
        Ok(records)
    }

    /// Missing tables or columns are a schema problem, not a generic failure
    fn classify(&self, err: rusqlite::Error) -> ExportError {
        if let rusqlite::Error::SqliteFailure(_, Some(message)) = &err {
            if message.starts_with("no such table") || message.starts_with("no such column") {
                return ExportError::SchemaMismatch {
                    path: self.path.clone(),
                    table: USER_STATS_TABLE.to_string(),
                    reason: message.clone(),
                };
            }
        }
        ExportError::Store(err)
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn decode_id(value: ValueRef<'_>) -> RecordId {
    match value {
        ValueRef::Integer(i) => RecordId::Integer(i),
        ValueRef::Real(f) => RecordId::Real(f),
        ValueRef::Text(t) | ValueRef::Blob(t) => RecordId::Text(lossy(t)),
        ValueRef::Null => {
            warn!("record without uid");
            RecordId::Text(String::new())
        }
    }
}

fn decode_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(lossy(t)),
    }
}

fn decode_timestamp(value: ValueRef<'_>) -> Option<RawTimestamp> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(ms) => Some(RawTimestamp::Millis(ms)),
        ValueRef::Real(ms) => Some(RawTimestamp::FractionalMillis(ms)),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(RawTimestamp::Text(lossy(t))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema::{create_user_stats, upsert_user_stats};

    #[test]
    fn test_load_records_decodes_columns() {
        let conn = Connection::open_in_memory().unwrap();
        create_user_stats(&conn).unwrap();
        upsert_user_stats(&conn, "u1", Some("Alice"), Some(r#"{"GMV": 100}"#), Some(1_700_000_000_000))
            .unwrap();
        upsert_user_stats(&conn, "u2", None, None, None).unwrap();

        let reader = StoreReader::from_connection(conn);
        let mut records = reader.load_records().unwrap();
        records.sort_by_key(|r| r.id.to_string());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, RecordId::new("u1"));
        assert_eq!(records[0].display_name.as_deref(), Some("Alice"));
        assert_eq!(records[0].payload.as_deref(), Some(r#"{"GMV": 100}"#));
        assert_eq!(records[0].updated_at, Some(RawTimestamp::Millis(1_700_000_000_000)));
        assert_eq!(records[1].display_name, None);
        assert_eq!(records[1].payload, None);
        assert_eq!(records[1].updated_at, None);
    }

    #[test]
    fn test_dynamic_cell_types_are_preserved() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE user_stats (uid, name, data, updated_at);
             INSERT INTO user_stats VALUES (42, 'Bob', '{}', 'last week');
             INSERT INTO user_stats VALUES ('x', 'Eve', '{}', 1700000000000.5);",
        )
        .unwrap();

        let records = StoreReader::from_connection(conn).load_records().unwrap();
        let bob = records.iter().find(|r| r.id == RecordId::Integer(42)).unwrap();
        assert_eq!(bob.updated_at, Some(RawTimestamp::Text("last week".to_string())));

        let eve = records.iter().find(|r| r.id == RecordId::new("x")).unwrap();
        assert_eq!(
            eve.updated_at,
            Some(RawTimestamp::FractionalMillis(1_700_000_000_000.5))
        );
    }

    #[test]
    fn test_missing_table_is_schema_mismatch() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE Mysqlks (id INTEGER)").unwrap();

        let err = StoreReader::from_connection(conn).load_records().unwrap_err();
        assert!(matches!(err, ExportError::SchemaMismatch { .. }), "{err}");
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE user_stats (uid TEXT, name TEXT)").unwrap();

        let err = StoreReader::from_connection(conn).load_records().unwrap_err();
        assert!(matches!(err, ExportError::SchemaMismatch { .. }), "{err}");
    }
}
