//! `DuckDB` connection management.
//!
//! The database is opened once; further connections are clones of the
//! primary handle, so in-memory stores are shared across every checkout.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use ::duckdb::Connection;

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    /// A database file on disk.
    File(PathBuf),
    /// A private in-memory database, dropped with the manager.
    Memory,
}

struct PoolInner {
    location: DbLocation,
    max_pool_size: usize,
    primary: Mutex<Connection>,
    idle: Mutex<Vec<Connection>>,
}

impl PoolInner {
    fn idle(&self) -> MutexGuard<'_, Vec<Connection>> {
        // A poisoned pool only ever holds fully constructed connections.
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A connection pool manager for `DuckDB` connections.
#[derive(Clone)]
pub struct DuckDbConnectionManager {
    inner: Arc<PoolInner>,
}

impl DuckDbConnectionManager {
    /// Open the database and keep the primary connection for the manager's lifetime.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or configured.
    pub fn open(location: DbLocation, max_pool_size: usize) -> Result<Self, ::duckdb::Error> {
        let primary = match &location {
            DbLocation::File(path) => Connection::open(path)?,
            DbLocation::Memory => Connection::open_in_memory()?,
        };
        configure_connection(&primary)?;

        Ok(Self {
            inner: Arc::new(PoolInner {
                location,
                max_pool_size: max_pool_size.max(1),
                primary: Mutex::new(primary),
                idle: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Check out a connection, reusing an idle one when available.
    ///
    /// # Errors
    /// Returns an error if a new connection cannot be cloned from the primary.
    pub fn acquire(&self) -> Result<PooledConnection, ::duckdb::Error> {
        let reused = self.inner.idle().pop();
        let connection = match reused {
            Some(connection) => connection,
            None => {
                let primary = self
                    .inner
                    .primary
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                let connection = primary.try_clone()?;
                configure_connection(&connection)?;
                connection
            }
        };

        Ok(PooledConnection {
            pool: Arc::clone(&self.inner),
            connection: Some(connection),
        })
    }

    pub fn location(&self) -> &DbLocation {
        &self.inner.location
    }

    /// Path of the database file, `None` for in-memory stores.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        match &self.inner.location {
            DbLocation::File(path) => Some(path.as_path()),
            DbLocation::Memory => None,
        }
    }

    #[cfg(test)]
    fn idle_count(&self) -> usize {
        self.inner.idle().len()
    }
}

/// A pooled connection that returns to the pool when dropped.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    connection: Option<Connection>,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .expect("pooled connection unexpectedly missing")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
            .as_mut()
            .expect("pooled connection unexpectedly missing")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        let mut idle = self.pool.idle();
        if idle.len() < self.pool.max_pool_size {
            idle.push(connection);
        }
    }
}

/// Configure a database connection with appropriate settings.
fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_connections_share_one_database() {
        let manager = DuckDbConnectionManager::open(DbLocation::Memory, 2).expect("open");
        {
            let first = manager.acquire().expect("first");
            first
                .execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (7);")
                .expect("create");
        }
        let first = manager.acquire().expect("reused");
        let second = manager.acquire().expect("cloned");
        let value: i32 = second
            .query_row("SELECT x FROM t", [], |row| row.get(0))
            .expect("visible through clone");
        assert_eq!(value, 7);
        drop(first);
        drop(second);
        assert_eq!(manager.idle_count(), 2);
    }

    #[test]
    fn idle_pool_is_capped() {
        let manager = DuckDbConnectionManager::open(DbLocation::Memory, 1).expect("open");
        let a = manager.acquire().expect("a");
        let b = manager.acquire().expect("b");
        drop(a);
        drop(b);
        assert_eq!(manager.idle_count(), 1);
        assert!(manager.db_path().is_none());
    }
}
