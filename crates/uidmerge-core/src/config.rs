use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MergeError, MergeResult};
use crate::writer::OutputOrder;

/// Field records are keyed by unless configured otherwise.
pub const DEFAULT_KEY_FIELD: &str = "uid";

/// Which merge store backs a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreBackend {
    /// Keep all record text in memory.
    Memory,
    /// Spill record text to a log on disk.
    ///
    /// With no `path` the store lives in a fresh temp directory. A given
    /// `path` must be missing, empty, or a store left by an earlier run; it
    /// is cleared before the run and removed after it, and may not contain
    /// the run's inputs or output.
    Disk {
        #[serde(default)]
        path: Option<PathBuf>,
    },
}

impl Default for StoreBackend {
    fn default() -> Self {
        Self::Disk { path: None }
    }
}

/// Configuration for a merge run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Name of the identifier field.
    pub key_field: String,
    /// Store used as working state.
    pub backend: StoreBackend,
    /// Output line order.
    pub order: OutputOrder,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            key_field: DEFAULT_KEY_FIELD.to_owned(),
            backend: StoreBackend::default(),
            order: OutputOrder::default(),
        }
    }
}

impl MergeConfig {
    /// Configuration that keeps the whole merge in memory.
    pub fn in_memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            ..Default::default()
        }
    }

    /// Parse a TOML configuration. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> MergeResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| MergeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML configuration file.
    pub fn from_toml_file(path: &Path) -> MergeResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| MergeError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> MergeResult<()> {
        if self.key_field.is_empty() {
            return Err(MergeError::Config("key_field must not be empty".into()));
        }
        Ok(())
    }
}
