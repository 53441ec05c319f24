//! SQLite access layer for Kotori.
//!
//! One [`Db`] handle wraps the connection pool; each domain gets its own
//! repository module with plain, runtime-bound queries. The schema is
//! bootstrapped with idempotent `CREATE TABLE IF NOT EXISTS` statements at
//! startup. Durability model: one SQLite file, last write wins.

use kotori_common::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

pub mod auto_roles;
pub mod bookmarks;
pub mod custom_roles;
pub mod event_roles;
pub mod goals;
pub mod kneels;
pub mod logs;
pub mod media_cache;
pub mod mutes;
pub mod questions;
pub mod quiz;
pub mod ranks;
pub mod schema;
pub mod sticky;
pub mod users;

/// Shared database handle.
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Connect to the SQLite database, creating the file when missing.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| kotori_common::KotoriError::config_with_source("Invalid database URL", e))?
            .create_if_missing(true)
            .foreign_keys(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        info!("Connected to database at {url}");
        Ok(Self { pool })
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// In-memory database for tests. A single connection keeps every
    /// query on the same memory instance.
    #[doc(hidden)]
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }
}
