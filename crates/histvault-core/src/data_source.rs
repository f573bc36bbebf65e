//! Upstream history source contract and request/error types.
//!
//! A [`HistorySource`] returns the daily records of one series over an
//! inclusive date range as a [`SeriesTable`]. Adapters own their retry
//! behaviour: `max_attempts` on the request bounds the total number of
//! upstream calls.
//!
//! # Example
//!
//! ```rust,ignore
//! use histvault_core::{DateRange, HistoryRequest, HistorySource, IfengAdapter, SeriesId};
//! use time::macros::date;
//!
//! async fn fetch(adapter: &IfengAdapter) -> Result<(), Box<dyn std::error::Error>> {
//!     let request = HistoryRequest::new(
//!         SeriesId::parse("000651")?,
//!         DateRange::trailing(date!(2024 - 06 - 03), 365),
//!         5,
//!     )?;
//!     let table = adapter.daily_history(request).await?;
//!     println!("{} rows", table.len());
//!     Ok(())
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use histvault_store::SeriesTable;

use crate::{DateRange, SeriesId, ValidationError};

/// Identifier of an upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    Ifeng,
    Static,
}

impl ProviderId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ifeng => "ifeng",
            Self::Static => "static",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    Internal,
}

/// Structured upstream error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    /// Same error, forced non-retryable. Used once attempts are exhausted.
    pub fn exhausted(mut self, attempts: u32) -> Self {
        self.message = format!("{} (gave up after {attempts} attempts)", self.message);
        self.retryable = false;
        self
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<ValidationError> for SourceError {
    fn from(value: ValidationError) -> Self {
        Self::invalid_request(value.to_string())
    }
}

/// Request payload for daily history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub series: SeriesId,
    pub range: DateRange,
    /// Total upstream calls allowed, including the first.
    pub max_attempts: u32,
}

impl HistoryRequest {
    pub fn new(series: SeriesId, range: DateRange, max_attempts: u32) -> Result<Self, ValidationError> {
        if max_attempts == 0 {
            return Err(ValidationError::ZeroAttempts);
        }
        Ok(Self {
            series,
            range,
            max_attempts,
        })
    }
}

/// Upstream history contract.
///
/// Implementations return rows inside `req.range` only, ascending by date,
/// or an empty table when the provider has nothing for the range.
pub trait HistorySource: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Fetch daily records for one series.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the provider stays unreachable or keeps
    /// answering with unusable payloads for `max_attempts` calls.
    fn daily_history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<SeriesTable, SourceError>> + Send + 'a>>;
}
