//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for performance and concurrency (WAL mode), and gating every operation on
//! one-time schema initialization.

use super::migrations;
use crate::Error;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tokio_rusqlite::Connection;

/// Schema lifecycle of a [`CacheDb`] handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Ready,
}

/// Lifecycle shared by every clone of one handle.
///
/// `ready` mirrors `state` so the common path never touches the mutex.
#[derive(Debug, Default)]
struct Lifecycle {
    ready: AtomicBool,
    state: Mutex<LifecycleState>,
    schema_runs: AtomicUsize,
}

/// Cache database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Cloning is cheap and clones share both the
/// connection and the schema lifecycle.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
    lifecycle: Arc<Lifecycle>,
}

impl CacheDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist and applies performance pragmas.
    /// The schema is created lazily by [`CacheDb::ensure_initialized`].
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .await
            .map_err(|e| Error::StorageUnavailable(format!("cannot open {}: {e}", path.display())))?;

        Self::configure(conn).await
    }

    /// Open an in-memory database for testing.
    ///
    /// Creates a temporary in-memory SQLite database with the same
    /// pragma configuration as file-based databases.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::StorageUnavailable(format!("cannot open in-memory database: {e}")))?;

        Self::configure(conn).await
    }

    async fn configure(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;
                 PRAGMA foreign_keys=ON;",
            )?;
            Ok(())
        })
        .await
        .map_err(|e: tokio_rusqlite::Error| Error::StorageUnavailable(format!("cannot configure database: {e}")))?;

        Ok(Self { conn, lifecycle: Arc::new(Lifecycle::default()) })
    }

    /// Ensure the schema exists, creating it on first use.
    ///
    /// Safe to call from many tasks at once: after the first success this is
    /// a single atomic load, and concurrent first callers serialize on the
    /// lifecycle mutex so the DDL runs exactly once.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageUnavailable` if the schema cannot be created.
    pub async fn ensure_initialized(&self) -> Result<(), Error> {
        if self.lifecycle.ready.load(Ordering::Acquire) {
            return Ok(());
        }

        let mut state = self.lifecycle.state.lock().await;
        if *state == LifecycleState::Ready {
            return Ok(());
        }

        migrations::run(&self.conn)
            .await
            .map_err(|e| Error::StorageUnavailable(format!("schema initialization failed: {e}")))?;

        self.lifecycle.schema_runs.fetch_add(1, Ordering::Relaxed);
        *state = LifecycleState::Ready;
        self.lifecycle.ready.store(true, Ordering::Release);
        tracing::debug!("cache schema initialized");

        Ok(())
    }

    /// Current lifecycle state of this handle.
    pub fn state(&self) -> LifecycleState {
        if self.lifecycle.ready.load(Ordering::Acquire) { LifecycleState::Ready } else { LifecycleState::Uninitialized }
    }

    /// Number of times schema creation actually ran for this handle.
    pub fn schema_runs(&self) -> usize {
        self.lifecycle.schema_runs.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let version = db
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
        assert_eq!(db.state(), LifecycleState::Uninitialized);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let enabled: i64 = db
            .conn
            .call(|conn| conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_ensure_initialized_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.ensure_initialized().await.unwrap();
        db.ensure_initialized().await.unwrap();
        assert_eq!(db.state(), LifecycleState::Ready);
        assert_eq!(db.schema_runs(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_initializes_once() {
        let db = CacheDb::open_in_memory().await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..32 {
            let db = db.clone();
            tasks.spawn(async move { db.ensure_initialized().await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        assert_eq!(db.schema_runs(), 1);
        assert_eq!(db.state(), LifecycleState::Ready);
    }

    #[tokio::test]
    async fn test_open_unreachable_path() {
        let result = CacheDb::open("/nonexistent-dir/deeper/cache.sqlite").await;
        assert!(matches!(result, Err(Error::StorageUnavailable(_))));
    }
}
