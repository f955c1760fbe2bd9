/// Configuration management for crewflow
///
/// Handles storage location and log filtering.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage configuration
    pub storage: StorageConfig,
    /// Logging configuration
    pub log: LogConfig,
}

/// Flow database location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file (default: "data/flows.db")
    pub database_path: PathBuf,
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive (e.g., "info", "crewflow=debug")
    pub filter: String,
}

impl Default for Config {
    /// Default configuration with ENV_VAR support
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                database_path: std::env::var("CREWFLOW_DB_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("data/flows.db")),
            },
            log: LogConfig {
                filter: std::env::var("CREWFLOW_LOG").unwrap_or_else(|_| "info".to_string()),
            },
        }
    }
}

impl Config {
    /// Override the database path when one is given
    pub fn with_database_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.storage.database_path = path;
        }
        self
    }
}
