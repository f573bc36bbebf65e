use histvault_store::{SeriesInfo, SeriesTable, Store};

use crate::config::MaintainerConfig;
use crate::{MaintainerError, SeriesId};

/// Read-only access to the tables of one library.
#[derive(Clone)]
pub struct HistoryReader {
    store: Store,
    library: String,
}

impl HistoryReader {
    pub fn new(store: Store, library: impl Into<String>) -> Self {
        Self {
            store,
            library: library.into(),
        }
    }

    /// Open the configured store for reading.
    pub fn open(config: &MaintainerConfig) -> Result<Self, MaintainerError> {
        let store = Store::open(config.store_config()?)?;
        Ok(Self::new(store, config.library.clone()))
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    /// The stored table for `series`, ascending by date.
    ///
    /// Fails with a not-found error when the library or series is absent.
    pub fn get(&self, series: &SeriesId) -> Result<SeriesTable, MaintainerError> {
        let library = self.store.library(&self.library)?;
        Ok(library.read(series.as_str())?)
    }

    /// Catalog entries for every stored series.
    pub fn list(&self) -> Result<Vec<SeriesInfo>, MaintainerError> {
        let library = self.store.library(&self.library)?;
        let mut infos = Vec::new();
        for series in library.list_series()? {
            infos.push(library.series_info(&series)?);
        }
        Ok(infos)
    }
}
