//! # Histvault Core
//!
//! Keeps a library of daily stock history tables current.
//!
//! ## Overview
//!
//! - **[`HistoryMaintainer`]** loads about a year of daily records per series
//!   ([`initialize`](HistoryMaintainer::initialize)) and appends today's
//!   record ([`download_delta`](HistoryMaintainer::download_delta))
//! - **[`HistoryReader`]** returns stored tables
//! - **[`HistorySource`]** is the upstream contract, implemented by
//!   [`IfengAdapter`] and the offline [`StaticSource`]
//! - Derived columns ([`DERIVED_COLUMNS`]) are stripped before anything is
//!   stored
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Upstream history adapters |
//! | [`clock`] | Market-local "today" |
//! | [`config`] | TOML configuration |
//! | [`data_source`] | Source trait, request and error types |
//! | [`domain`] | Series ids and date ranges |
//! | [`filter`] | Derived-column removal |
//! | [`http_client`] | HTTP transport seam |
//! | [`maintainer`] | Initialize / delta / get |
//! | [`reader`] | Read-only table access |
//! | [`retry`] | Bounded retry with backoff |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use histvault_core::{HistoryMaintainer, IfengAdapter, MaintainerConfig, SeriesId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MaintainerConfig::new(
//!         "duckdb://history.duckdb",
//!         "cn_stocks",
//!         SeriesId::parse_all(["000651", "600036"])?,
//!     );
//!     let maintainer = HistoryMaintainer::open(config, Arc::new(IfengAdapter::default()))?;
//!
//!     maintainer.initialize().await?;
//!     maintainer.download_delta().await?;
//!
//!     let table = maintainer.get_data(&SeriesId::parse("000651")?)?;
//!     println!("{} rows", table.len());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod clock;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod filter;
pub mod http_client;
pub mod maintainer;
pub mod reader;
pub mod retry;

pub use adapters::{IfengAdapter, StaticSource};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, MaintainerConfig};
pub use data_source::{HistoryRequest, HistorySource, ProviderId, SourceError, SourceErrorKind};
pub use domain::{DateRange, SeriesId};
pub use error::{MaintainerError, ValidationError};
pub use filter::{strip_columns, strip_derived_columns, DERIVED_COLUMNS};
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use maintainer::{HistoryMaintainer, SeriesOutcome, SeriesSync, SyncReport};
pub use reader::HistoryReader;
pub use retry::{Backoff, RetryPolicy};

// Store types (re-exported from histvault-store)
pub use histvault_store::{
    AppendReport, DailyRow, Library, SeriesInfo, SeriesTable, Store, StoreConfig, StoreError,
};
