/*!
 * Database connection pool.
 *
 * This module handles SQLite connection creation and initialization on top
 * of an r2d2 pool. Every operation borrows one connection for the duration of
 * its closure. Async callers go through `execute_async`, which runs on
 * tokio's blocking pool.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::schema;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// How long `acquire` waits for a free connection
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connection borrowed from the pool, returned when dropped
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pooled database connection handle, cheap to clone
#[derive(Clone)]
pub struct DatabaseConnection {
    /// Path to the database file
    db_path: PathBuf,
    /// Shared connection pool
    pool: r2d2::Pool<SqliteConnectionManager>,
}

impl DatabaseConnection {
    /// Open a pool of `pool_size` connections at the specified path
    ///
    /// The schema is created or migrated on a bootstrap connection before the
    /// pool is built, so an unusable path fails immediately.
    pub fn new<P: AsRef<Path>>(db_path: P, pool_size: usize) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        let pool_size = u32::try_from(pool_size.max(1)).unwrap_or(u32::MAX);

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        info!("Opening database at: {:?} ({} connections)", db_path, pool_size);

        {
            let mut conn = Connection::open(&db_path)
                .with_context(|| format!("Failed to open database: {:?}", db_path))?;
            configure_file_connection(&mut conn).context("Failed to configure database")?;
            schema::initialize_schema(&conn)?;
        }

        let manager = SqliteConnectionManager::file(&db_path).with_init(configure_file_connection);
        let pool = r2d2::Pool::builder()
            .max_size(pool_size)
            .connection_timeout(CHECKOUT_TIMEOUT)
            .build(manager)
            .with_context(|| format!("Failed to build connection pool for {:?}", db_path))?;

        Ok(Self { db_path, pool })
    }

    /// Create an in-memory database with a single connection (for testing)
    ///
    /// Every in-memory connection is its own database, so the one connection
    /// is never retired.
    pub fn new_in_memory() -> Result<Self> {
        debug!("Creating in-memory database");

        let pool = r2d2::Pool::builder()
            .max_size(1)
            .min_idle(Some(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_timeout(CHECKOUT_TIMEOUT)
            .build(SqliteConnectionManager::memory())
            .context("Failed to create in-memory database")?;

        // Initialize schema
        {
            let conn = pool.get().context("Failed to create in-memory database")?;
            schema::initialize_schema(&conn)?;
        }

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            pool,
        })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Maximum number of connections owned by the pool
    pub fn pool_size(&self) -> u32 {
        self.pool.max_size()
    }

    /// Number of connections currently idle
    pub fn idle_connections(&self) -> u32 {
        self.pool.state().idle_connections
    }

    /// Borrow a connection, waiting until one is free
    pub fn acquire(&self) -> Result<PooledConnection> {
        self.pool.get().context("Failed to get a pooled database connection")
    }

    /// Execute a database operation with a pooled connection
    ///
    /// The connection goes back to the pool when the closure returns. For
    /// async contexts, use `execute_async`.
    pub fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.acquire()?;
        f(&conn)
    }

    /// Execute a database operation asynchronously using spawn_blocking
    ///
    /// This is the preferred method for async contexts as it prevents
    /// blocking the async runtime.
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();

        tokio::task::spawn_blocking(move || {
            let conn = db.acquire()?;
            f(&conn)
        })
        .await
        .context("Database task panicked")?
    }

    /// Begin a transaction and execute operations within it
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<T>,
    {
        let mut conn = self.acquire()?;

        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;

        Ok(result)
    }

    /// Begin an async transaction and execute operations within it
    pub async fn transaction_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = db.acquire()?;

            let tx = conn.transaction()?;
            let result = f(&tx)?;
            tx.commit()?;

            Ok(result)
        })
        .await
        .context("Database transaction task panicked")?
    }
}

fn configure_file_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")
}
