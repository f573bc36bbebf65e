//! # Histvault Store
//!
//! DuckDB-backed time-series store for daily history tables.
//!
//! ## Overview
//!
//! A [`Store`] holds named libraries. Each library is a `DuckDB` schema and
//! each series inside it is one table keyed by a `date` column, with every
//! other column stored as `DOUBLE`. A small catalog records the column order,
//! row count and date bounds of every series.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use histvault_store::{SeriesTable, Store, StoreConfig};
//! use time::macros::date;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::open(StoreConfig::from_address("duckdb://:memory:")?)?;
//!     let library = store.initialize_library("cn_stocks")?;
//!
//!     let mut table = SeriesTable::new(["open", "close"]);
//!     table.push_row(date!(2024 - 01 - 02), vec![Some(10.1), Some(10.4)])?;
//!     library.write("000651", &table)?;
//!
//!     assert_eq!(library.read("000651")?.len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `histvault_libraries` | Initialized libraries |
//! | `histvault_series` | Column layout and bounds per series |
//! | `histvault_write_log` | Audit log of writes and appends |
//! | `"<library>"."<series>"` | The series data |

pub mod duckdb;
mod error;
mod library;
mod migrations;
mod names;
pub mod table;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{params, Connection};
use tracing::{debug, info};

pub use duckdb::{DbLocation, DuckDbConnectionManager, PooledConnection};
pub use error::StoreError;
pub use library::{AppendReport, Library, SeriesInfo};
pub use table::{format_iso_date, parse_iso_date, DailyRow, SeriesTable};

use crate::names::{quote_ident, validate_library_name};

const DEFAULT_DB_FILE: &str = "history.duckdb";
const ADDRESS_SCHEME: &str = "duckdb://";
const MEMORY_ADDRESS: &str = ":memory:";

/// Configuration for opening a [`Store`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Where the database lives.
    pub location: DbLocation,
    /// Maximum number of idle connections kept for reuse.
    pub max_pool_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: DbLocation::File(resolve_histvault_home().join(DEFAULT_DB_FILE)),
            max_pool_size: 4,
        }
    }
}

impl StoreConfig {
    /// Parse a store address.
    ///
    /// Accepted forms: `duckdb://<path>`, `duckdb://:memory:`, `:memory:`
    /// and a bare filesystem path.
    pub fn from_address(address: &str) -> Result<Self, StoreError> {
        let trimmed = address.trim();
        let target = trimmed.strip_prefix(ADDRESS_SCHEME).unwrap_or(trimmed);
        if target.is_empty() {
            return Err(StoreError::InvalidName {
                kind: "store address",
                value: address.to_owned(),
                reason: "must name a database file or :memory:",
            });
        }

        let location = if target == MEMORY_ADDRESS {
            DbLocation::Memory
        } else {
            DbLocation::File(PathBuf::from(target))
        };
        Ok(Self {
            location,
            ..Self::default()
        })
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            location: DbLocation::File(path.into()),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self {
            location: DbLocation::Memory,
            ..Self::default()
        }
    }
}

/// Handle to an opened time-series store.
#[derive(Clone)]
pub struct Store {
    manager: DuckDbConnectionManager,
}

impl Store {
    /// Open a store, creating the database file and catalog when missing.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        if let DbLocation::File(path) = &config.location {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = DuckDbConnectionManager::open(config.location, config.max_pool_size)?;
        {
            let connection = manager.acquire()?;
            migrations::apply_migrations(&connection)?;
        }
        debug!(location = ?manager.location(), "store opened");
        Ok(Self { manager })
    }

    /// Path of the database file, `None` for in-memory stores.
    pub fn db_path(&self) -> Option<&Path> {
        self.manager.db_path()
    }

    /// Create the library if needed and return a handle to it.
    pub fn initialize_library(&self, name: &str) -> Result<Library, StoreError> {
        validate_library_name(name)?;

        let connection = self.manager.acquire()?;
        if let Some(existing) = case_variant(&connection, name)? {
            return Err(StoreError::NameConflict {
                kind: "library",
                name: name.to_owned(),
                existing,
            });
        }
        connection.execute_batch(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(name)))?;
        let inserted = connection.execute(
            "INSERT OR IGNORE INTO histvault_libraries (name) VALUES (?)",
            params![name],
        )?;
        if inserted > 0 {
            info!(library = name, "library initialized");
        }

        Ok(Library::new(name, self.manager.clone()))
    }

    /// Handle to an existing library.
    pub fn library(&self, name: &str) -> Result<Library, StoreError> {
        validate_library_name(name)?;

        let connection = self.manager.acquire()?;
        let count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM histvault_libraries WHERE name = ?",
            params![name],
            |row| row.get(0),
        )?;
        if count == 0 {
            return Err(StoreError::LibraryNotFound {
                library: name.to_owned(),
            });
        }

        Ok(Library::new(name, self.manager.clone()))
    }

    /// Names of all initialized libraries, sorted.
    pub fn list_libraries(&self) -> Result<Vec<String>, StoreError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare("SELECT name FROM histvault_libraries ORDER BY name")?;
        let names = statement
            .query_map(params![], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

/// Another library whose name equals `name` ignoring case.
fn case_variant(connection: &Connection, name: &str) -> Result<Option<String>, StoreError> {
    let mut statement = connection.prepare(
        "SELECT name FROM histvault_libraries WHERE lower(name) = lower(?) AND name <> ? LIMIT 1",
    )?;
    let mut rows = statement.query(params![name, name])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let existing: String = row.get(0)?;
    Ok(Some(existing))
}

/// Resolve the histvault home directory from environment or default.
pub fn resolve_histvault_home() -> PathBuf {
    if let Some(path) = env::var_os("HISTVAULT_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".histvault");
    }

    PathBuf::from(".histvault")
}
