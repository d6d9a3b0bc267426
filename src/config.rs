//! Engine configuration, loaded from a JSON file.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RhymeConfig {
    /// Page size used when a caller does not pass one.
    pub default_limit: usize,
    /// Candidates fetched per requested item before professional filtering.
    pub overfetch_multiplier: usize,
    /// Hard cap on the over-fetch window.
    pub max_overfetch: usize,
}

impl Default for RhymeConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            overfetch_multiplier: 10,
            max_overfetch: 5000,
        }
    }
}

impl RhymeConfig {
    pub fn fetch_window(&self, limit: usize) -> usize {
        limit
            .max(1)
            .saturating_mul(self.overfetch_multiplier.max(1))
            .min(self.max_overfetch.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Records inserted per bulk call when loading a CSV file.
    pub chunk_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { chunk_size: 500 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rhyme: RhymeConfig,
    pub ingest: IngestConfig,
    pub snapshot_path: Option<PathBuf>,
}

impl EngineConfig {
    /// Reads a JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text).map_err(|e| EngineError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"rhyme": {{"overfetch_multiplier": 3}}}}"#).unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.rhyme.overfetch_multiplier, 3);
        assert_eq!(config.rhyme.default_limit, 10);
        assert_eq!(config.ingest.chunk_size, 500);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            EngineConfig::load(file.path()),
            Err(EngineError::Config { .. })
        ));
    }

    #[test]
    fn fetch_window_is_capped() {
        let config = RhymeConfig { default_limit: 10, overfetch_multiplier: 10, max_overfetch: 50 };
        assert_eq!(config.fetch_window(3), 30);
        assert_eq!(config.fetch_window(20), 50);
        assert_eq!(config.fetch_window(0), 10);
    }
}
