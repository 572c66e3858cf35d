//! Persistent configuration for symdex.
//!
//! Loads/saves a TOML config at `~/.symdex/config.toml`.

use crate::IndexError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level symdex configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SymdexConfig {
    pub frontend: FrontendConfig,
    pub pipeline: PipelineConfig,
}

impl SymdexConfig {
    /// Load configuration from the given path.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| IndexError::Config(e.to_string()))
    }

    /// Save configuration to the given path.
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| IndexError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from the default path, or return defaults if the file doesn't exist.
    pub fn load_or_default() -> Self {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Default config path: `~/.symdex/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".symdex")
            .join("config.toml")
    }
}

/// Frontend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    /// Path prefixes treated as system headers. Entities whose canonical
    /// location falls under one of these are marked `is_system_def`.
    /// `-isystem` compiler arguments extend this list per translation unit.
    pub system_include_prefixes: Vec<String>,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            system_include_prefixes: vec![
                "/usr/include".to_string(),
                "/usr/local/include".to_string(),
            ],
        }
    }
}

/// Indexing pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of worker threads for multi-unit indexing. 0 means one worker
    /// per available CPU.
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { workers: 0 }
    }
}
