//! The `user_stats` table
//!
//! One row per user: uid, display name, a JSON document of statistics
//! (GMV, spend, ROI, ...) and the last update time in milliseconds.

use crate::error::ExportResult;
use rusqlite::{params, Connection};

/// Table read by the export
pub const USER_STATS_TABLE: &str = "user_stats";

/// The single read query; column order matches [`RawRecord`](crate::flatten::RawRecord)
pub const SELECT_USER_STATS: &str = "SELECT uid, name, data, updated_at FROM user_stats";

const CREATE_USER_STATS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_stats (
    uid TEXT PRIMARY KEY,
    name TEXT,
    data TEXT,                    -- JSON object, keys vary per user
    updated_at INTEGER            -- Unix timestamp in milliseconds
)
"#;

const UPSERT_USER_STATS: &str = r#"
INSERT INTO user_stats (uid, name, data, updated_at)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(uid) DO UPDATE SET
    name = excluded.name,
    data = excluded.data,
    updated_at = excluded.updated_at
"#;

/// Create the table if it does not exist
pub fn create_user_stats(conn: &Connection) -> ExportResult<()> {
    conn.execute(CREATE_USER_STATS_TABLE, [])?;
    Ok(())
}

/// Insert or replace one user's row
pub fn upsert_user_stats(
    conn: &Connection,
    uid: &str,
    name: Option<&str>,
    data: Option<&str>,
    updated_at_ms: Option<i64>,
) -> ExportResult<()> {
    conn.execute(UPSERT_USER_STATS, params![uid, name, data, updated_at_ms])?;
    Ok(())
}
