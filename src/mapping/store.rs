// ingesttool/src/mapping/store.rs
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::Result;

const BUSY_TIMEOUT_MS: u64 = 5_000;
const MAX_CONNECTIONS: u32 = 5;

/// Current mapping of a logical path to its storage identifier.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MappingRecord {
    pub path: String,
    pub fileid: String,
    pub updated_at: DateTime<Utc>,
}

/// Durable store of (logical path -> storage identifier) mappings.
///
/// The store owns the `filelist` table exclusively. Replacement of an
/// existing mapping is a single atomic statement; concurrent writers for
/// the same path serialize at the database, never in application code.
#[derive(Debug, Clone)]
pub struct MappingStore {
    pool: SqlitePool,
}

impl MappingStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        let store = MappingStore { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS filelist (
                path       TEXT PRIMARY KEY,
                fileid     TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Atomically records `fileid` as the current identifier for `path`,
    /// replacing any previous mapping. Paths and identifiers are opaque,
    /// untrusted strings; they are only ever bound as parameters.
    pub async fn upsert(&self, path: &str, fileid: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO filelist (path, fileid, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(path) DO UPDATE SET
                 fileid = excluded.fileid,
                 updated_at = excluded.updated_at",
        )
        .bind(path)
        .bind(fileid)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn lookup(&self, path: &str) -> Result<Option<MappingRecord>> {
        let record = sqlx::query_as::<_, MappingRecord>(
            "SELECT path, fileid, updated_at FROM filelist WHERE path = ?1",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    pub async fn list_all(&self) -> Result<Vec<MappingRecord>> {
        let records = sqlx::query_as::<_, MappingRecord>(
            "SELECT path, fileid, updated_at FROM filelist ORDER BY path",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Removes the mapping for `path`. Returns whether a record existed.
    pub async fn remove(&self, path: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM filelist WHERE path = ?1")
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
