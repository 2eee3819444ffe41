use serde::{Deserialize, Serialize};

/// Default size of the buffer used to copy between files and streams.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Tuning for file transfers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Bytes copied per read/write step. Zero is treated as one.
    pub chunk_size: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl TransferConfig {
    pub(crate) fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = TransferConfig::default();
        assert_eq!(c.chunk_size, 32 * 1024);
    }

    #[test]
    fn zero_chunk_size_is_clamped() {
        let c = TransferConfig { chunk_size: 0 };
        assert_eq!(c.effective_chunk_size(), 1);
    }

    #[test]
    fn parse_from_toml() {
        let c: TransferConfig = toml::from_str("chunk_size = 4096").unwrap();
        assert_eq!(c.chunk_size, 4096);
        let empty: TransferConfig = toml::from_str("").unwrap();
        assert_eq!(empty, TransferConfig::default());
    }
}
