use crate::config::ExportConfig;
use crate::error::{ExportError, ExportResult};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::debug;

/// Paths checked for the store, in order.
///
/// An explicit `store_path` is the only candidate. Otherwise the working
/// directory comes first, then each app folder under `%APPDATA%`.
pub fn candidate_paths(
    config: &ExportConfig,
    cwd: Option<PathBuf>,
    app_data: Option<OsString>,
) -> Vec<PathBuf> {
    if let Some(path) = &config.store_path {
        return vec![path.clone()];
    }

    let mut candidates = Vec::new();
    if let Some(cwd) = cwd {
        candidates.push(cwd.join(&config.store_file_name));
    }
    if let Some(app_data) = app_data.filter(|dir| !dir.is_empty()) {
        let app_data = PathBuf::from(app_data);
        for folder in &config.app_folders {
            candidates.push(app_data.join(folder).join(&config.store_file_name));
        }
    }
    candidates
}

/// Find the first candidate that exists on disk
pub fn locate_store(config: &ExportConfig) -> ExportResult<PathBuf> {
    let candidates = candidate_paths(
        config,
        std::env::current_dir().ok(),
        std::env::var_os("APPDATA"),
    );

    for candidate in &candidates {
        if candidate.is_file() {
            return Ok(candidate.clone());
        }
        debug!(path = %candidate.display(), "no store here");
    }

    Err(ExportError::SourceNotFound {
        file_name: config.store_file_name.clone(),
        searched: candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_order() {
        let config = ExportConfig::default();
        let candidates = candidate_paths(
            &config,
            Some(PathBuf::from("/work")),
            Some(OsString::from("/appdata")),
        );

        assert_eq!(candidates.len(), 5);
        assert_eq!(candidates[0], PathBuf::from("/work/app_data.db"));
        assert_eq!(candidates[1], PathBuf::from("/appdata/electron-app/app_data.db"));
        assert_eq!(candidates[4], PathBuf::from("/appdata/your-app-name/app_data.db"));
    }

    #[test]
    fn test_no_appdata_means_cwd_only() {
        let config = ExportConfig::default();
        let candidates = candidate_paths(&config, Some(PathBuf::from("/work")), None);
        assert_eq!(candidates, vec![PathBuf::from("/work/app_data.db")]);
    }

    #[test]
    fn test_explicit_path_disables_search() {
        let config = ExportConfig {
            store_path: Some(PathBuf::from("/data/stats.db")),
            ..ExportConfig::default()
        };
        let candidates = candidate_paths(
            &config,
            Some(PathBuf::from("/work")),
            Some(OsString::from("/appdata")),
        );
        assert_eq!(candidates, vec![PathBuf::from("/data/stats.db")]);
    }

    #[test]
    fn test_missing_explicit_path_is_source_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            store_path: Some(dir.path().join("missing.db")),
            ..ExportConfig::default()
        };

        let err = locate_store(&config).unwrap_err();
        match err {
            ExportError::SourceNotFound { searched, .. } => {
                assert_eq!(searched, vec![dir.path().join("missing.db")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
