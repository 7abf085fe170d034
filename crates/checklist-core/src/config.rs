//! Application configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use checklist_records::StorageLocation;

use crate::error::CoreError;
use crate::Result;

const DATABASE_FILE: &str = "checklist.db";
const ENV_DB_PATH: &str = "CHECKLIST_DB_PATH";
const ENV_IN_MEMORY: &str = "CHECKLIST_IN_MEMORY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file. `None` when the host exposes no local data
    /// directory.
    pub database_path: Option<PathBuf>,
    /// Keep records in memory only; nothing survives the process
    #[serde(default)]
    pub in_memory: bool,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: Some(data_dir.join(DATABASE_FILE)),
            in_memory: false,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            database_path: None,
            in_memory: true,
        }
    }

    /// `Checklist` under the per-user local data directory.
    ///
    /// `None` when the platform exposes no such directory (or its variables
    /// are unset); the store then reports the environment as unsupported
    /// unless `CHECKLIST_DB_PATH` or in-memory mode is set.
    pub fn data_dir() -> Option<PathBuf> {
        let base = if cfg!(target_os = "windows") {
            env_path("LOCALAPPDATA")
        } else if cfg!(target_os = "macos") {
            env_path("HOME").map(|h| h.join("Library/Application Support"))
        } else if cfg!(target_os = "linux") {
            env_path("XDG_DATA_HOME").or_else(|| env_path("HOME").map(|h| h.join(".local/share")))
        } else {
            None
        };

        base.map(|d| d.join("Checklist"))
    }

    /// Defaults plus `CHECKLIST_DB_PATH` / `CHECKLIST_IN_MEMORY` overrides
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(
            std::env::var(ENV_DB_PATH).ok(),
            std::env::var(ENV_IN_MEMORY).ok(),
        )
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn with_overrides(mut self, db_path: Option<String>, in_memory: Option<String>) -> Result<Self> {
        if let Some(path) = db_path.filter(|p| !p.trim().is_empty()) {
            self.database_path = Some(PathBuf::from(path));
        }

        if let Some(flag) = in_memory {
            self.in_memory = match flag.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                other => {
                    return Err(CoreError::Config(format!(
                        "{ENV_IN_MEMORY} must be a boolean, got {other:?}"
                    )))
                }
            };
        }

        Ok(self)
    }

    /// Where the record store should live, if anywhere
    pub fn storage_location(&self) -> Option<StorageLocation> {
        if self.in_memory {
            return Some(StorageLocation::Memory);
        }
        self.database_path.clone().map(StorageLocation::File)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: Self::data_dir().map(|d| d.join(DATABASE_FILE)),
            in_memory: false,
        }
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
