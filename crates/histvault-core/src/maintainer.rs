//! Bulk load and daily delta of configured series into the store.

use std::sync::Arc;

use serde::Serialize;
use time::Date;
use tracing::{info, warn};

use histvault_store::table::iso_date;
use histvault_store::{Library, SeriesTable, Store};

use crate::clock::Clock;
use crate::config::MaintainerConfig;
use crate::data_source::{HistoryRequest, HistorySource};
use crate::filter::strip_derived_columns;
use crate::reader::HistoryReader;
use crate::{DateRange, MaintainerError, SeriesId};

/// What happened to one series during a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SeriesOutcome {
    /// Table replaced with `rows` rows.
    Written { rows: usize },
    /// `rows` appended; `skipped` dates were already stored.
    Appended { rows: usize, skipped: usize },
    /// Upstream had nothing for the range; the store was not touched.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesSync {
    pub series: SeriesId,
    #[serde(flatten)]
    pub outcome: SeriesOutcome,
}

/// Per-series outcomes of [`HistoryMaintainer::initialize`] or
/// [`HistoryMaintainer::download_delta`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub library: String,
    #[serde(with = "iso_date")]
    pub start: Date,
    #[serde(with = "iso_date")]
    pub end: Date,
    pub series: Vec<SeriesSync>,
}

impl SyncReport {
    fn new(library: &str, range: DateRange) -> Self {
        Self {
            library: library.to_owned(),
            start: range.start(),
            end: range.end(),
            series: Vec::new(),
        }
    }

    fn record(&mut self, series: &SeriesId, outcome: SeriesOutcome) {
        self.series.push(SeriesSync {
            series: series.clone(),
            outcome,
        });
    }

    pub fn outcome(&self, series: &str) -> Option<&SeriesOutcome> {
        self.series
            .iter()
            .find(|entry| entry.series.as_str() == series)
            .map(|entry| &entry.outcome)
    }

    /// Rows stored across all series.
    pub fn rows_stored(&self) -> usize {
        self.series
            .iter()
            .map(|entry| match entry.outcome {
                SeriesOutcome::Written { rows } | SeriesOutcome::Appended { rows, .. } => rows,
                SeriesOutcome::Empty => 0,
            })
            .sum()
    }
}

/// Keeps one library of daily history tables up to date.
///
/// Series are processed sequentially in configured order. An upstream
/// failure that survives all attempts aborts the remaining series.
pub struct HistoryMaintainer {
    config: MaintainerConfig,
    store: Store,
    source: Arc<dyn HistorySource>,
    clock: Arc<dyn Clock>,
}

impl HistoryMaintainer {
    /// Open the configured store and use the configured market clock.
    pub fn open(
        config: MaintainerConfig,
        source: Arc<dyn HistorySource>,
    ) -> Result<Self, MaintainerError> {
        config.validate()?;
        let clock: Arc<dyn Clock> = Arc::new(config.clock()?);
        let store = Store::open(config.store_config()?)?;
        Ok(Self {
            config,
            store,
            source,
            clock,
        })
    }

    /// Build around an already opened store.
    pub fn with_store(
        config: MaintainerConfig,
        store: Store,
        source: Arc<dyn HistorySource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, MaintainerError> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            source,
            clock,
        })
    }

    pub fn config(&self) -> &MaintainerConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn reader(&self) -> HistoryReader {
        HistoryReader::new(self.store.clone(), self.config.library.clone())
    }

    /// Load the lookback window for every series, replacing stored tables.
    ///
    /// Creates the library when missing.
    pub async fn initialize(&self) -> Result<SyncReport, MaintainerError> {
        let library = self.store.initialize_library(&self.config.library)?;
        let range = DateRange::trailing(self.clock.today(), self.config.lookback_days);
        let mut report = SyncReport::new(library.name(), range);

        for series in &self.config.series {
            let Some(mut table) = self.fetch(series, range).await? else {
                report.record(series, SeriesOutcome::Empty);
                continue;
            };

            table.sort_by_date();
            let duplicates = table.dedup_dates();
            if duplicates > 0 {
                warn!(%series, duplicates, "upstream returned repeated dates; keeping the first");
            }
            strip_derived_columns(&mut table);
            library.write(series.as_str(), &table)?;

            info!(library = library.name(), %series, rows = table.len(), "series initialized");
            report.record(series, SeriesOutcome::Written { rows: table.len() });
        }

        Ok(report)
    }

    /// Fetch today's record for every series and append it.
    ///
    /// The library must already exist. Re-running on the same day stores
    /// nothing new.
    pub async fn download_delta(&self) -> Result<SyncReport, MaintainerError> {
        let library = self.store.library(&self.config.library)?;
        let range = DateRange::single_day(self.clock.today());
        let mut report = SyncReport::new(library.name(), range);

        for series in &self.config.series {
            let Some(mut table) = self.fetch(series, range).await? else {
                report.record(series, SeriesOutcome::Empty);
                continue;
            };

            strip_derived_columns(&mut table);
            let appended = append(&library, series, &table)?;
            report.record(series, appended);
        }

        Ok(report)
    }

    /// Full stored table for `series`.
    pub fn get_data(&self, series: &SeriesId) -> Result<SeriesTable, MaintainerError> {
        self.reader().get(series)
    }

    async fn fetch(
        &self,
        series: &SeriesId,
        range: DateRange,
    ) -> Result<Option<SeriesTable>, MaintainerError> {
        let request = HistoryRequest::new(series.clone(), range, self.config.max_attempts)?;
        let table = self
            .source
            .daily_history(request)
            .await
            .map_err(|source| MaintainerError::source_failure(series.as_str(), source))?;

        if table.is_empty() {
            warn!(
                %series,
                %range,
                provider = %self.source.id(),
                "upstream returned no rows; leaving stored data untouched"
            );
            return Ok(None);
        }
        Ok(Some(table))
    }
}

fn append(
    library: &Library,
    series: &SeriesId,
    table: &SeriesTable,
) -> Result<SeriesOutcome, MaintainerError> {
    let report = library.append(series.as_str(), table)?;
    info!(
        library = library.name(),
        %series,
        appended = report.appended,
        skipped = report.skipped.len(),
        "series delta appended"
    );
    Ok(SeriesOutcome::Appended {
        rows: report.appended,
        skipped: report.skipped.len(),
    })
}
