use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wbl_store::SyncMode;

use crate::error::{SdkError, SdkResult};

/// Settings for a ledger instance, usually read from `wbl.toml`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Directory holding the ledger's files.
    pub data_dir: PathBuf,
    /// WAL file name, relative to `data_dir`.
    pub wal_file: String,
    pub sync_mode: SyncMode,
    /// Upper bound on the page size of paginated queries.
    pub max_page_size: u32,
    /// Pretty-print JSON query payloads.
    pub pretty_json: bool,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".wbl"),
            wal_file: "state.wal".into(),
            sync_mode: SyncMode::default(),
            max_page_size: 1000,
            pretty_json: false,
            log_filter: "info".into(),
        }
    }
}

impl LedgerConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml(text: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> SdkResult<()> {
        if self.max_page_size == 0 {
            return Err(SdkError::Config("max_page_size must be greater than zero".into()));
        }
        if self.wal_file.is_empty() {
            return Err(SdkError::Config("wal_file must not be empty".into()));
        }
        Ok(())
    }

    /// Full path of the write-ahead log.
    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join(&self.wal_file)
    }
}
