use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use histvault_store::SeriesTable;

use crate::data_source::{HistoryRequest, HistorySource, ProviderId, SourceError};
use crate::retry::RetryPolicy;

#[derive(Default)]
struct Entry {
    table: Option<SeriesTable>,
    /// Retryable failures to serve before answering.
    pending_failures: u32,
    /// Fail every call with this error.
    hard_failure: Option<SourceError>,
}

/// Deterministic in-memory history source.
///
/// Tables are keyed by series id and filtered to the requested range. A
/// series can be scripted to fail a number of times, or always, so retry
/// and abort paths can be exercised offline.
#[derive(Default)]
pub struct StaticSource {
    entries: Mutex<HashMap<String, Entry>>,
    calls: AtomicU32,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `table` for `series`. Rows need not be sorted.
    pub fn with_table(self, series: impl Into<String>, table: SeriesTable) -> Self {
        self.set_table(series, table);
        self
    }

    pub fn set_table(&self, series: impl Into<String>, table: SeriesTable) {
        self.entries().entry(series.into()).or_default().table = Some(table);
    }

    /// Fail the next `count` calls for `series` with a retryable error.
    pub fn fail_times(self, series: impl Into<String>, count: u32) -> Self {
        self.entries()
            .entry(series.into())
            .or_default()
            .pending_failures = count;
        self
    }

    /// Fail every call for `series` with `error`.
    pub fn fail_always(self, series: impl Into<String>, error: SourceError) -> Self {
        self.entries().entry(series.into()).or_default().hard_failure = Some(error);
        self
    }

    /// Upstream calls served so far, retries included.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn serve(&self, req: &HistoryRequest) -> Result<SeriesTable, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(req.series.as_str()) else {
            return Ok(SeriesTable::default());
        };

        if let Some(error) = &entry.hard_failure {
            return Err(error.clone());
        }
        if entry.pending_failures > 0 {
            entry.pending_failures -= 1;
            return Err(SourceError::unavailable(format!(
                "scripted failure for '{}'",
                req.series
            )));
        }

        let Some(table) = &entry.table else {
            return Ok(SeriesTable::default());
        };
        let mut table = table.clone();
        table.retain_rows(|row| req.range.contains(row.date));
        Ok(table)
    }
}

impl HistorySource for StaticSource {
    fn id(&self) -> ProviderId {
        ProviderId::Static
    }

    fn daily_history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<SeriesTable, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            RetryPolicy::immediate()
                .run(req.max_attempts, req.series.as_str(), |_| {
                    let result = self.serve(&req);
                    async move { result }
                })
                .await
        })
    }
}
