//! Database connection pool abstraction
//!
//! One interface over the SQLite and MySQL backends. The backend is chosen
//! from `DatabaseConfig::driver` at startup; repositories ask the pool for
//! its driver and borrow the concrete sqlx pool for their queries.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DatabaseConfig, DatabaseDriver};

const SQLITE_MAX_CONNECTIONS: u32 = 16;
const MYSQL_MAX_CONNECTIONS: u32 = 32;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Operations every backend supports regardless of dialect.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Run a statement that returns no rows; yields the affected row count
    async fn execute(&self, query: &str) -> Result<u64>;

    async fn ping(&self) -> Result<()>;

    async fn close(&self);

    fn driver(&self) -> DatabaseDriver;

    fn as_sqlite(&self) -> Option<&SqlitePool>;

    fn as_mysql(&self) -> Option<&MySqlPool>;
}

/// Shared handle to whichever backend is configured
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// A connected sqlx pool for one of the supported backends
pub enum Database {
    Sqlite(SqlitePool),
    Mysql(MySqlPool),
}

impl Database {
    /// Open (and create if missing) a SQLite database.
    ///
    /// Accepts a bare file path, a `sqlite:` URL or `:memory:`. An in-memory
    /// database lives on a single connection that is never recycled, since
    /// dropping it would discard the data.
    pub async fn open_sqlite(url: &str) -> Result<Self> {
        let (options, pool_options) = if is_memory_url(url) {
            (
                SqliteConnectOptions::from_str("sqlite::memory:")?,
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None),
            )
        } else {
            let path = strip_sqlite_scheme(url);
            ensure_parent_dir(Path::new(path))?;
            (
                SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true),
                SqlitePoolOptions::new().max_connections(SQLITE_MAX_CONNECTIONS),
            )
        };

        let pool = pool_options
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options.foreign_keys(true))
            .await
            .with_context(|| format!("Failed to open SQLite database {}", url))?;
        Ok(Database::Sqlite(pool))
    }

    /// Connect to MySQL; a URL without scheme gets `mysql://` prepended
    pub async fn connect_mysql(url: &str) -> Result<Self> {
        let url_with_scheme = match url.strip_prefix("mysql://") {
            Some(_) => url.to_string(),
            None => format!("mysql://{}", url),
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(MYSQL_MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(&url_with_scheme)
            .await
            .with_context(|| format!("Failed to connect to MySQL at {}", url))?;
        Ok(Database::Mysql(pool))
    }
}

fn is_memory_url(url: &str) -> bool {
    url == ":memory:" || url.starts_with("sqlite::memory:")
}

fn strip_sqlite_scheme(url: &str) -> &str {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    path.split('?').next().unwrap_or(path)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create database directory {}", parent.display())),
        _ => Ok(()),
    }
}

#[async_trait]
impl DatabasePool for Database {
    async fn execute(&self, query: &str) -> Result<u64> {
        let affected = match self {
            Database::Sqlite(pool) => sqlx::query(query).execute(pool).await?.rows_affected(),
            Database::Mysql(pool) => sqlx::query(query).execute(pool).await?.rows_affected(),
        };
        Ok(affected)
    }

    async fn ping(&self) -> Result<()> {
        self.execute("SELECT 1")
            .await
            .map(|_| ())
            .context("Database ping failed")
    }

    async fn close(&self) {
        match self {
            Database::Sqlite(pool) => pool.close().await,
            Database::Mysql(pool) => pool.close().await,
        }
    }

    fn driver(&self) -> DatabaseDriver {
        match self {
            Database::Sqlite(_) => DatabaseDriver::Sqlite,
            Database::Mysql(_) => DatabaseDriver::Mysql,
        }
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        match self {
            Database::Sqlite(pool) => Some(pool),
            Database::Mysql(_) => None,
        }
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        match self {
            Database::Mysql(pool) => Some(pool),
            Database::Sqlite(_) => None,
        }
    }
}

/// Connect to the configured backend.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    let database = match config.driver {
        DatabaseDriver::Sqlite => Database::open_sqlite(&config.url).await?,
        DatabaseDriver::Mysql => Database::connect_mysql(&config.url).await?,
    };
    tracing::info!("Connected to {:?} database", config.driver);
    Ok(Arc::new(database))
}

/// Fresh in-memory SQLite database, used by tests
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    let database = Database::open_sqlite(":memory:").await?;
    Ok(Arc::new(database))
}
