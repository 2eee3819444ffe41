use std::path::{Path, PathBuf};

use anyhow::Context;
use ferry_transfer::{TransferConfig, DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};

/// Settings read from `--config`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FerryConfig {
    /// Root directory of the local object store.
    pub store_root: PathBuf,
    pub chunk_size: usize,
}

impl Default for FerryConfig {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from(".ferry"),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl FerryConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load `path` if given, then apply command-line overrides.
    pub fn resolve(path: Option<&Path>, root: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        if let Some(root) = root {
            config.store_root = root.to_path_buf();
        }
        Ok(config)
    }

    pub fn transfer(&self) -> TransferConfig {
        TransferConfig {
            chunk_size: self.chunk_size,
        }
    }
}
