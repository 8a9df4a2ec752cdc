//! Database connection pool management and schema setup.

use std::path::Path;
use std::time::{Duration, Instant};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use mnema_core::Result;

use crate::events::EventStore;
use crate::items::ItemStore;

/// Default maximum number of connections in the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;

/// Default connection timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Pool configuration options.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of connections.
    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// The catalog database handle.
///
/// Cheap to clone; clones share the underlying pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if necessary) the catalog at the given file path.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with(path, PoolConfig::default()).await
    }

    /// Open the catalog with custom pool configuration.
    pub async fn connect_with(path: impl AsRef<Path>, config: PoolConfig) -> Result<Self> {
        let start = Instant::now();

        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            // ON DELETE SET NULL is inert without this pragma
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;

        info!(
            path = %path.as_ref().display(),
            duration_ms = start.elapsed().as_millis() as u64,
            "catalog database ready"
        );
        Ok(db)
    }

    /// Open an in-memory catalog (tests). A single connection keeps the
    /// in-memory database alive and shared.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Item repository view of this database.
    pub fn items(&self) -> ItemStore {
        ItemStore::new(self.pool.clone())
    }

    /// Event repository view of this database.
    pub fn events(&self) -> EventStore {
        EventStore::new(self.pool.clone())
    }

    /// Underlying pool, for ad-hoc queries in tests.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, flushing outstanding work.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn init_schema(&self) -> Result<()> {
        // events comes first only lexically; SQLite resolves the circular
        // item <-> event references at DML time, not at CREATE time.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                main_location TEXT,
                summary TEXT,
                cover_item_id INTEGER REFERENCES items(id) ON DELETE SET NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_path TEXT NOT NULL UNIQUE,
                file_hash TEXT NOT NULL UNIQUE,
                kind TEXT NOT NULL,
                has_consent INTEGER NOT NULL DEFAULT 0,
                is_rotated INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                latitude REAL,
                longitude REAL,
                transcript TEXT,
                image_index_id INTEGER,
                text_index_id INTEGER,
                event_id INTEGER REFERENCES events(id) ON DELETE SET NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for stmt in [
            "CREATE INDEX IF NOT EXISTS idx_items_created_at ON items(created_at)",
            "CREATE INDEX IF NOT EXISTS idx_items_consent ON items(has_consent)",
            "CREATE INDEX IF NOT EXISTS idx_items_event ON items(event_id)",
        ] {
            sqlx::query(stmt).execute(&self.pool).await?;
        }

        debug!("catalog schema initialized");
        Ok(())
    }
}
