use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (creating the database directory).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("library '{library}' does not exist")]
    LibraryNotFound { library: String },

    #[error("series '{series}' not found in library '{library}'")]
    SeriesNotFound { library: String, series: String },

    #[error("invalid {kind} name '{value}': {reason}")]
    InvalidName {
        kind: &'static str,
        value: String,
        reason: &'static str,
    },

    /// Names that differ only in case share one database object.
    #[error("{kind} '{name}' collides with existing {kind} '{existing}'; names are case-insensitive")]
    NameConflict {
        kind: &'static str,
        name: String,
        existing: String,
    },

    #[error("series '{series}' stores columns {expected:?}, append supplied {found:?}")]
    SchemaMismatch {
        series: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("table row {index} has {found} values but {expected} columns are declared")]
    RowWidth {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("catalog entry for '{series}' is unreadable: {reason}")]
    CorruptCatalog { series: String, reason: String },
}

impl StoreError {
    /// True for errors that mean the requested library or series is absent.
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::LibraryNotFound { .. } | Self::SeriesNotFound { .. }
        )
    }
}
