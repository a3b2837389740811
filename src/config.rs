use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, MatchResult};

/// Connection settings for the match store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// How long a writer waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("matches.db"),
            busy_timeout_ms: 10_000,
        }
    }
}

impl EngineConfig {
    /// Load a JSON config file. Missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> MatchResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| MatchError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn with_busy_timeout_ms(mut self, ms: u64) -> Self {
        self.busy_timeout_ms = ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.database_path, PathBuf::from("matches.db"));
        assert_eq!(c.busy_timeout_ms, 10_000);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"database_path": "/tmp/city.db"}}"#).unwrap();

        let c = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(c.database_path, PathBuf::from("/tmp/city.db"));
        assert_eq!(c.busy_timeout_ms, 10_000);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "busy_timeout_ms = 5").unwrap();

        let err = EngineConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, MatchError::Config { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = EngineConfig::from_json_file("/nonexistent/matchmaker.json").unwrap_err();
        assert!(matches!(err, MatchError::Io(_)));
    }

    #[test]
    fn test_builders() {
        let c = EngineConfig::default()
            .with_database_path("x.db")
            .with_busy_timeout_ms(5);
        assert_eq!(c.database_path, PathBuf::from("x.db"));
        assert_eq!(c.busy_timeout_ms, 5);
    }
}
