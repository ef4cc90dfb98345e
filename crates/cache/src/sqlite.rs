//! SQLite cache backend.
//!
//! One table, `response_cache`, keyed by the request digest. Timestamps are
//! stored as fixed-width RFC 3339 UTC strings so expiry checks can compare
//! them as text inside SQL.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use thirdvoice_core::analysis::AnalysisResult;
use thirdvoice_core::cache::{CacheEntry, CacheStore, latest_expiry};
use thirdvoice_core::error::CacheError;
use tracing::{debug, info};

/// A persistent cache stored in a single SQLite file.
pub struct SqliteCache {
    pool: SqlitePool,
}

fn timestamp(t: DateTime<Utc>) -> String {
    t.min(latest_expiry()).to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CacheError::Storage(format!("Bad timestamp '{raw}': {e}")))
}

impl SqliteCache {
    /// Open (or create) the database at `path`.
    ///
    /// Pass `":memory:"` for an ephemeral database.
    pub async fn new(path: &str) -> Result<Self, CacheError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| CacheError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // An in-memory database lives per connection, so pin it to one.
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| CacheError::Storage(format!("Failed to open SQLite: {e}")))?;

        let cache = Self { pool };
        cache.run_migrations().await?;
        info!("SQLite cache initialized at {path}");
        Ok(cache)
    }

    async fn run_migrations(&self) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS response_cache (
                cache_key     TEXT PRIMARY KEY NOT NULL,
                payload       TEXT NOT NULL,
                subject_id    TEXT NOT NULL DEFAULT '',
                requester_id  TEXT NOT NULL DEFAULT '',
                created_at    TEXT NOT NULL,
                expires_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CacheError::MigrationFailed(format!("response_cache table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_response_cache_expires ON response_cache(expires_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CacheError::MigrationFailed(format!("expires index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_response_cache_requester ON response_cache(requester_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CacheError::MigrationFailed(format!("requester index: {e}")))?;

        Ok(())
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<CacheEntry, CacheError> {
        let get = |col: &str| -> Result<String, CacheError> {
            row.try_get::<String, _>(col)
                .map_err(|e| CacheError::Storage(format!("Missing column {col}: {e}")))
        };

        let result: AnalysisResult = serde_json::from_str(&get("payload")?)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        Ok(CacheEntry {
            key: get("cache_key")?,
            result,
            subject_id: get("subject_id")?,
            requester_id: get("requester_id")?,
            created_at: parse_timestamp(&get("created_at")?)?,
            expires_at: parse_timestamp(&get("expires_at")?)?,
        })
    }
}

#[async_trait]
impl CacheStore for SqliteCache {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let row = sqlx::query(
            "SELECT cache_key, payload, subject_id, requester_id, created_at, expires_at
             FROM response_cache WHERE cache_key = ? AND expires_at > ?",
        )
        .bind(key)
        .bind(timestamp(Utc::now()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CacheError::Storage(e.to_string()))?;

        row.as_ref().map(Self::row_to_entry).transpose()
    }

    async fn put(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let payload = serde_json::to_string(&entry.result)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO response_cache
                (cache_key, payload, subject_id, requester_id, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(cache_key) DO UPDATE SET
                payload = excluded.payload,
                subject_id = excluded.subject_id,
                requester_id = excluded.requester_id,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(&entry.key)
        .bind(&payload)
        .bind(&entry.subject_id)
        .bind(&entry.requester_id)
        .bind(timestamp(entry.created_at))
        .bind(timestamp(entry.expires_at))
        .execute(&self.pool)
        .await
        .map_err(|e| CacheError::Storage(e.to_string()))?;

        debug!(key = %entry.key, "Cache entry stored");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let result = sqlx::query("DELETE FROM response_cache WHERE cache_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        let result = sqlx::query("DELETE FROM response_cache WHERE expires_at <= ?")
            .bind(timestamp(Utc::now()))
            .execute(&self.pool)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;
        Ok(result.rows_affected() as usize)
    }

    async fn purge_requester(&self, requester_id: &str) -> Result<usize, CacheError> {
        let result = sqlx::query("DELETE FROM response_cache WHERE requester_id = ?")
            .bind(requester_id)
            .execute(&self.pool)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;
        Ok(result.rows_affected() as usize)
    }

    async fn count(&self) -> Result<usize, CacheError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM response_cache")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;
        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| CacheError::Storage(e.to_string()))?;
        Ok(count as usize)
    }
}
