//! Repository for cached sheet snapshots
//!
//! A snapshot is one full read of a sheet (header and rows) stored as JSON
//! together with the time it was taken. Snapshots are keyed by the workbook
//! they came from so switching workbooks never serves stale rows.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::sheets::SheetData;

/// Open (creating if needed) the cache database and make sure the table exists
pub async fn connect(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory: {}", parent.display()))?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open cache database: {}", path.display()))?;

    ensure_schema(&pool).await?;
    Ok(pool)
}

/// In-memory cache database
#[cfg(test)]
pub async fn connect_in_memory() -> Result<SqlitePool> {
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .context("Failed to build in-memory cache options")?;
    // A single connection keeps the in-memory database alive and shared
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .context("Failed to open in-memory cache database")?;

    ensure_schema(&pool).await?;
    Ok(pool)
}

async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sheet_snapshots (
            source TEXT NOT NULL,
            sheet TEXT NOT NULL,
            fetched_at INTEGER NOT NULL,
            data_json TEXT NOT NULL,
            PRIMARY KEY (source, sheet)
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create sheet_snapshots table")?;

    Ok(())
}

/// Get a snapshot taken at or after `not_before` (unix seconds)
pub async fn get_snapshot(
    pool: &SqlitePool,
    source: &str,
    sheet: &str,
    not_before: i64,
) -> Result<Option<SheetData>> {
    let row: Option<(i64, String)> = sqlx::query_as(
        "SELECT fetched_at, data_json FROM sheet_snapshots
         WHERE source = ? AND sheet = ?",
    )
    .bind(source)
    .bind(sheet)
    .fetch_optional(pool)
    .await
    .context("Failed to get sheet snapshot")?;

    let Some((fetched_at, data_json)) = row else {
        return Ok(None);
    };

    if fetched_at < not_before {
        log::debug!(
            "Snapshot of '{}' is stale (taken at {}, need {})",
            sheet,
            fetched_at,
            not_before
        );
        return Ok(None);
    }

    let data: SheetData =
        serde_json::from_str(&data_json).context("Failed to deserialize sheet snapshot")?;
    Ok(Some(data))
}

/// Store (or replace) the snapshot of a sheet
pub async fn put_snapshot(
    pool: &SqlitePool,
    source: &str,
    sheet: &str,
    data: &SheetData,
    fetched_at: i64,
) -> Result<()> {
    let data_json = serde_json::to_string(data).context("Failed to serialize sheet snapshot")?;

    sqlx::query(
        "INSERT INTO sheet_snapshots (source, sheet, fetched_at, data_json)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(source, sheet)
         DO UPDATE SET fetched_at = excluded.fetched_at, data_json = excluded.data_json",
    )
    .bind(source)
    .bind(sheet)
    .bind(fetched_at)
    .bind(data_json)
    .execute(pool)
    .await
    .context("Failed to store sheet snapshot")?;

    Ok(())
}

/// Drop the snapshot of one sheet
pub async fn delete_snapshot(pool: &SqlitePool, source: &str, sheet: &str) -> Result<()> {
    sqlx::query("DELETE FROM sheet_snapshots WHERE source = ? AND sheet = ?")
        .bind(source)
        .bind(sheet)
        .execute(pool)
        .await
        .context("Failed to delete sheet snapshot")?;

    Ok(())
}

/// Drop every snapshot of a workbook, returning how many were removed
pub async fn clear_snapshots(pool: &SqlitePool, source: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sheet_snapshots WHERE source = ?")
        .bind(source)
        .execute(pool)
        .await
        .context("Failed to clear sheet snapshots")?;

    Ok(result.rows_affected())
}

/// Time-to-live cache of full sheet reads for one workbook
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    pool: SqlitePool,
    source: String,
    ttl: Duration,
}

impl SnapshotCache {
    pub fn new(pool: SqlitePool, source: impl Into<String>, ttl: Duration) -> Self {
        Self {
            pool,
            source: source.into(),
            ttl,
        }
    }

    /// Fresh snapshot of a sheet, or `None` if missing or older than the TTL
    pub async fn get(&self, sheet: &str) -> Result<Option<SheetData>> {
        self.get_at(sheet, Utc::now().timestamp()).await
    }

    pub async fn get_at(&self, sheet: &str, now: i64) -> Result<Option<SheetData>> {
        if self.ttl.is_zero() {
            return Ok(None);
        }
        let not_before = now - self.ttl.as_secs() as i64 + 1;
        get_snapshot(&self.pool, &self.source, sheet, not_before).await
    }

    pub async fn put(&self, sheet: &str, data: &SheetData) -> Result<()> {
        self.put_at(sheet, data, Utc::now().timestamp()).await
    }

    pub async fn put_at(&self, sheet: &str, data: &SheetData, now: i64) -> Result<()> {
        put_snapshot(&self.pool, &self.source, sheet, data, now).await
    }

    pub async fn invalidate(&self, sheet: &str) -> Result<()> {
        delete_snapshot(&self.pool, &self.source, sheet).await
    }

    pub async fn clear(&self) -> Result<u64> {
        clear_snapshots(&self.pool, &self.source).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> SheetData {
        SheetData {
            header: vec!["ID".to_string(), "品名".to_string()],
            rows: vec![vec!["P-1".to_string(), "ThinkPad".to_string()]],
        }
    }

    #[tokio::test]
    async fn test_snapshot_is_served_until_ttl_expires() {
        let pool = connect_in_memory().await.unwrap();
        let cache = SnapshotCache::new(pool, "inventory.xlsx", Duration::from_secs(600));

        cache.put_at("PC", &sheet(), 1_000).await.unwrap();

        assert_eq!(cache.get_at("PC", 1_000).await.unwrap(), Some(sheet()));
        assert_eq!(cache.get_at("PC", 1_599).await.unwrap(), Some(sheet()));
        assert_eq!(cache.get_at("PC", 1_600).await.unwrap(), None);
        assert_eq!(cache.get_at("iPad", 1_000).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_replaces_and_invalidate_removes() {
        let pool = connect_in_memory().await.unwrap();
        let cache = SnapshotCache::new(pool, "inventory.xlsx", Duration::from_secs(600));

        cache.put_at("PC", &SheetData::default(), 1_000).await.unwrap();
        cache.put_at("PC", &sheet(), 1_100).await.unwrap();
        assert_eq!(cache.get_at("PC", 1_650).await.unwrap(), Some(sheet()));

        cache.invalidate("PC").await.unwrap();
        assert_eq!(cache.get_at("PC", 1_100).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_workbooks_do_not_share_snapshots() {
        let pool = connect_in_memory().await.unwrap();
        let ttl = Duration::from_secs(600);
        let a = SnapshotCache::new(pool.clone(), "a.xlsx", ttl);
        let b = SnapshotCache::new(pool, "b.xlsx", ttl);

        a.put_at("PC", &sheet(), 1_000).await.unwrap();
        a.put_at("iPad", &sheet(), 1_000).await.unwrap();
        assert_eq!(b.get_at("PC", 1_000).await.unwrap(), None);

        b.put_at("PC", &sheet(), 1_000).await.unwrap();
        assert_eq!(a.clear().await.unwrap(), 2);
        assert!(b.get_at("PC", 1_000).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_the_cache() {
        let pool = connect_in_memory().await.unwrap();
        let cache = SnapshotCache::new(pool, "inventory.xlsx", Duration::ZERO);

        cache.put_at("PC", &sheet(), 1_000).await.unwrap();
        assert_eq!(cache.get_at("PC", 1_000).await.unwrap(), None);
    }
}
