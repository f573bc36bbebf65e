use thiserror::Error;

use histvault_store::StoreError;

use crate::data_source::SourceError;

/// Input validation failures for identifiers, date ranges and settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("series id must not be empty")]
    EmptySeriesId,

    #[error("series id length {len} exceeds max {max}")]
    SeriesIdTooLong { len: usize, max: usize },

    #[error("series id contains invalid character '{ch}' at index {index}")]
    SeriesIdInvalidChar { ch: char, index: usize },

    #[error("date range start {start} is after end {end}")]
    InvertedRange { start: String, end: String },

    #[error("max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("utc offset {hours}h is outside -23..=23")]
    UtcOffsetOutOfRange { hours: i8 },

    #[error("no series configured")]
    NoSeries,
}

/// Failures surfaced by [`HistoryMaintainer`](crate::HistoryMaintainer) and
/// [`HistoryReader`](crate::HistoryReader).
#[derive(Debug, Error)]
pub enum MaintainerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("upstream fetch for series '{series}' failed: {source}")]
    Source {
        series: String,
        #[source]
        source: SourceError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MaintainerError {
    pub fn source_failure(series: impl Into<String>, source: SourceError) -> Self {
        Self::Source {
            series: series.into(),
            source,
        }
    }

    /// True when the requested library or series does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(error) if error.is_not_found())
    }
}
