//! Configuration handling for srcxref

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::IndexError;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "srcxref.toml";

/// srcxref configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Database settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Ingestion pipeline settings
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// How long a writer waits on a locked database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Bound of the transaction queue between producers and the worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Declaration/reference rows buffered per flush
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("srcxref.db")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_queue_capacity() -> usize {
    16
}

fn default_batch_size() -> usize {
    100
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let content = fs::read_to_string(path)
            .map_err(|e| IndexError::Config(format!("failed to read config file: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| IndexError::Config(format!("failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `srcxref.toml` from `dir`, or the defaults when there is none
    pub fn load_or_default(dir: &Path) -> Result<Self, IndexError> {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    fn validate(&self) -> Result<(), IndexError> {
        if self.ingest.queue_capacity == 0 {
            return Err(IndexError::Config(
                "ingest.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.ingest.batch_size == 0 {
            return Err(IndexError::Config(
                "ingest.batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.path, PathBuf::from("srcxref.db"));
        assert_eq!(config.store.busy_timeout_ms, 5000);
        assert_eq!(config.ingest.queue_capacity, 16);
        assert_eq!(config.ingest.batch_size, 100);
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "[ingest]\nqueue_capacity = 2\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.ingest.queue_capacity, 2);
        assert_eq!(config.ingest.batch_size, 100);
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn test_load_or_default_without_file() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_or_default(temp.path()).unwrap();
        assert_eq!(config.ingest.queue_capacity, 16);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);

        fs::write(&path, "[ingest]\nqueue_capacity = 0\n").unwrap();
        assert_eq!(Config::load(&path).unwrap_err().code(), "E120");

        fs::write(&path, "[store\npath = 1").unwrap();
        assert_eq!(Config::load(&path).unwrap_err().code(), "E120");
    }
}
