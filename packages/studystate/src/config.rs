//! Store configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Environment variable overriding `StoreConfig::data_dir`.
pub const DATA_DIR_ENV: &str = "STUDYSTATE_DATA_DIR";

const DEFAULT_FILE_NAME: &str = "study_state.json";

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("studystate"))
        .unwrap_or_else(|| PathBuf::from("studystate"))
}

fn default_file_name() -> String {
    DEFAULT_FILE_NAME.to_string()
}

/// Where and how study state is persisted.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the state file. Created on open if missing.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Keep everything in memory; nothing touches the disk.
    #[serde(default)]
    pub in_memory: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            file_name: default_file_name(),
            in_memory: false,
        }
    }
}

impl StoreConfig {
    /// Defaults, with `data_dir` taken from `STUDYSTATE_DATA_DIR` when set.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|name| std::env::var(name).ok())
    }

    fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = var(DATA_DIR_ENV).filter(|s| !s.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn in_directory(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn memory() -> Self {
        Self {
            in_memory: true,
            ..Self::default()
        }
    }

    pub fn state_file(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }
}
