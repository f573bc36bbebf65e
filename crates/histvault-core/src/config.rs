//! Maintainer settings, loadable from TOML.
//!
//! ```toml
//! store = "duckdb:///var/lib/histvault/history.duckdb"
//! library = "cn_stocks"
//! series = ["000651", "600036"]
//! max_attempts = 5
//! lookback_days = 365
//! utc_offset_hours = 8
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use histvault_store::{StoreConfig, StoreError};

use crate::clock::SystemClock;
use crate::{SeriesId, ValidationError};

pub const DEFAULT_LIBRARY: &str = "cn_stocks";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_LOOKBACK_DAYS: u32 = 365;
/// China Standard Time; "today" follows the exchange calendar.
pub const DEFAULT_UTC_OFFSET_HOURS: i8 = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] ValidationError),

    #[error("invalid store address: {0}")]
    Store(#[from] StoreError),
}

/// Everything a [`HistoryMaintainer`](crate::HistoryMaintainer) needs besides
/// its source and clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaintainerConfig {
    /// Store address; `None` selects the default database under the home dir.
    pub store: Option<String>,
    pub library: String,
    pub series: Vec<SeriesId>,
    /// Total upstream calls per series, including the first.
    pub max_attempts: u32,
    /// Days before today covered by an initial load.
    pub lookback_days: u32,
    pub utc_offset_hours: i8,
}

impl Default for MaintainerConfig {
    fn default() -> Self {
        Self {
            store: None,
            library: DEFAULT_LIBRARY.to_owned(),
            series: Vec::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
        }
    }
}

impl MaintainerConfig {
    pub fn new(store: impl Into<String>, library: impl Into<String>, series: Vec<SeriesId>) -> Self {
        Self {
            store: Some(store.into()),
            library: library.into(),
            series,
            ..Self::default()
        }
    }

    /// Read and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::ZeroAttempts);
        }
        SystemClock::from_hours(self.utc_offset_hours)?;
        Ok(())
    }

    /// Store settings for the configured address.
    pub fn store_config(&self) -> Result<StoreConfig, StoreError> {
        match &self.store {
            Some(address) => StoreConfig::from_address(address),
            None => Ok(StoreConfig::default()),
        }
    }

    pub fn clock(&self) -> Result<SystemClock, ValidationError> {
        SystemClock::from_hours(self.utc_offset_hours)
    }
}
