//! Database connection pools
//!
//! SQLite and MySQL behind one [`DatabasePool`] trait object. Sizing and
//! timeouts come from `DatabaseConfig`; repositories borrow the concrete
//! sqlx pool through `as_sqlite` / `as_mysql`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DatabaseConfig, DatabaseDriver};

#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Run a statement that returns no rows; yields rows affected
    async fn execute(&self, sql: &str) -> Result<u64>;

    /// Round-trip `SELECT 1`
    async fn ping(&self) -> Result<()>;

    async fn close(&self);

    fn driver(&self) -> DatabaseDriver;

    fn as_sqlite(&self) -> Option<&SqlitePool>;

    fn as_mysql(&self) -> Option<&MySqlPool>;
}

pub type DynDatabasePool = Arc<dyn DatabasePool>;

#[derive(Debug, Clone, Copy)]
struct PoolLimits {
    max_connections: u32,
    connect_timeout: Duration,
    idle_timeout: Duration,
}

impl From<&DatabaseConfig> for PoolLimits {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections.max(1),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs.max(1)),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        }
    }
}

pub struct SqliteDatabase {
    pool: SqlitePool,
}

pub struct MysqlDatabase {
    pool: MySqlPool,
}

/// Both drivers share every trait method but the accessors
macro_rules! impl_database_pool {
    ($ty:ty, $driver:expr, sqlite: $sqlite:expr, mysql: $mysql:expr) => {
        #[async_trait]
        impl DatabasePool for $ty {
            async fn execute(&self, sql: &str) -> Result<u64> {
                let done = sqlx::query(sql)
                    .execute(&self.pool)
                    .await
                    .with_context(|| format!("Statement failed: {}", sql))?;
                Ok(done.rows_affected())
            }

            async fn ping(&self) -> Result<()> {
                sqlx::query("SELECT 1")
                    .execute(&self.pool)
                    .await
                    .context("Database ping failed")?;
                Ok(())
            }

            async fn close(&self) {
                self.pool.close().await;
            }

            fn driver(&self) -> DatabaseDriver {
                $driver
            }

            fn as_sqlite(&self) -> Option<&SqlitePool> {
                let accessor: fn(&Self) -> Option<&SqlitePool> = $sqlite;
                accessor(self)
            }

            fn as_mysql(&self) -> Option<&MySqlPool> {
                let accessor: fn(&Self) -> Option<&MySqlPool> = $mysql;
                accessor(self)
            }
        }
    };
}

impl_database_pool!(
    SqliteDatabase,
    DatabaseDriver::Sqlite,
    sqlite: |db| Some(&db.pool),
    mysql: |_| None
);
impl_database_pool!(
    MysqlDatabase,
    DatabaseDriver::Mysql,
    sqlite: |_| None,
    mysql: |db| Some(&db.pool)
);

fn is_sqlite_memory(url: &str) -> bool {
    matches!(url, ":memory:" | "sqlite::memory:")
}

/// Turn a bare path or `sqlite:` URL into a sqlx URL that creates the file
fn sqlite_connection_url(url: &str) -> String {
    if is_sqlite_memory(url) {
        return "sqlite::memory:".to_string();
    }
    let url = if url.starts_with("sqlite:") {
        url.to_string()
    } else {
        format!("sqlite:{}", url)
    };
    if url.contains('?') {
        url
    } else {
        format!("{}?mode=rwc", url)
    }
}

impl SqliteDatabase {
    async fn open(url: &str, limits: PoolLimits) -> Result<Self> {
        let in_memory = is_sqlite_memory(url);

        if !in_memory {
            let file = url.trim_start_matches("sqlite:");
            let file = file.split('?').next().unwrap_or(file);
            if let Some(dir) = Path::new(file).parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create database directory {:?}", dir))?;
            }
        }

        let options = SqlitePoolOptions::new()
            .acquire_timeout(limits.connect_timeout)
            // Per connection, so every pooled connection enforces cascades
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON").execute(conn).await?;
                    Ok(())
                })
            });

        // An in-memory database dies with its last connection, so pin one
        let options = if in_memory {
            options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options
                .max_connections(limits.max_connections)
                .idle_timeout(Some(limits.idle_timeout))
        };

        let pool = options
            .connect(&sqlite_connection_url(url))
            .await
            .with_context(|| format!("Failed to open SQLite database {}", url))?;
        Ok(Self { pool })
    }
}

impl MysqlDatabase {
    async fn open(url: &str, limits: PoolLimits) -> Result<Self> {
        let url = if url.starts_with("mysql://") {
            url.to_string()
        } else {
            format!("mysql://{}", url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(limits.max_connections)
            .acquire_timeout(limits.connect_timeout)
            .idle_timeout(Some(limits.idle_timeout))
            .connect(&url)
            .await
            .context("Failed to connect to MySQL")?;
        Ok(Self { pool })
    }
}

/// Open the pool `database.driver` selects.
///
/// # Errors
///
/// Fails when no connection is established within `connect_timeout_secs`.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    let limits = PoolLimits::from(config);
    let pool: DynDatabasePool = match config.driver {
        DatabaseDriver::Sqlite => Arc::new(SqliteDatabase::open(&config.url, limits).await?),
        DatabaseDriver::Mysql => Arc::new(MysqlDatabase::open(&config.url, limits).await?),
    };
    Ok(pool)
}

/// Private in-memory SQLite database, one per call
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    create_pool(&DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
        ..Default::default()
    })
    .await
}
