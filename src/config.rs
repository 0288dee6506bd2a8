//! Export configuration
//!
//! Where to find the store, where to write the export, and how to order and
//! label its columns.

use crate::flatten::columns::DEFAULT_PRIORITY;
use chrono::{DateTime, FixedOffset, Local, Utc};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::PathBuf;

/// File name of the statistics store written by the desktop app
pub const DEFAULT_STORE_FILE: &str = "app_data.db";

/// Prefix of every export file name
pub const DEFAULT_FILE_PREFIX: &str = "快手数据报表";

/// Application data folders the desktop app may have been installed under
pub const DEFAULT_APP_FOLDERS: [&str; 4] = ["electron-app", "Electron", "electron", "your-app-name"];

/// Header labels used by the desktop app's own report
static FRIENDLY_HEADER_LABELS: Lazy<HashMap<String, String>> = Lazy::new(|| {
    [
        ("UID", "用户ID"),
        ("名称", "用户名称"),
        ("花费", "总花费"),
        ("消耗", "实时消耗"),
        ("上次花费", "上次记录花费"),
        ("roi", "当前ROI"),
    ]
    .into_iter()
    .map(|(column, label)| (column.to_string(), label.to_string()))
    .collect()
});

/// Configuration for one export run
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Explicit store path; disables the search when set
    pub store_path: Option<PathBuf>,

    /// Store file name looked for during the search
    pub store_file_name: String,

    /// Folder names tried under `%APPDATA%`
    pub app_folders: Vec<String>,

    /// Directory the export file is written into
    pub output_dir: PathBuf,

    /// Export file name prefix, followed by the generation timestamp
    pub file_prefix: String,

    /// Columns that lead the export, in this order
    pub priority: Vec<String>,

    /// Display labels for header cells, keyed by column name
    pub header_labels: HashMap<String, String>,

    /// Offset for rendered times; the machine's local zone when unset
    pub utc_offset: Option<FixedOffset>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            store_path: None,
            store_file_name: DEFAULT_STORE_FILE.to_string(),
            app_folders: DEFAULT_APP_FOLDERS.iter().map(|s| s.to_string()).collect(),
            output_dir: PathBuf::from("."),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            priority: DEFAULT_PRIORITY.iter().map(|s| s.to_string()).collect(),
            header_labels: HashMap::new(),
            utc_offset: None,
        }
    }
}

impl ExportConfig {
    /// Use the desktop app's report labels for the header row
    pub fn with_friendly_headers(mut self) -> Self {
        for (column, label) in FRIENDLY_HEADER_LABELS.iter() {
            self.header_labels
                .entry(column.clone())
                .or_insert_with(|| label.clone());
        }
        self
    }

    /// Current time in the configured zone
    pub fn now(&self) -> DateTime<FixedOffset> {
        match self.utc_offset {
            Some(offset) => Utc::now().with_timezone(&offset),
            None => Local::now().fixed_offset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.store_file_name, "app_data.db");
        assert_eq!(config.priority.first().map(String::as_str), Some("UID"));
        assert_eq!(config.app_folders.len(), 4);
        assert!(config.header_labels.is_empty());
    }

    #[test]
    fn test_friendly_headers_keep_explicit_labels() {
        let mut config = ExportConfig::default();
        config
            .header_labels
            .insert("UID".to_string(), "账号".to_string());

        let config = config.with_friendly_headers();
        assert_eq!(config.header_labels["UID"], "账号");
        assert_eq!(config.header_labels["花费"], "总花费");
    }

    #[test]
    fn test_now_uses_configured_offset() {
        let config = ExportConfig {
            utc_offset: FixedOffset::east_opt(8 * 3600),
            ..ExportConfig::default()
        };
        assert_eq!(config.now().offset().local_minus_utc(), 8 * 3600);
    }
}
