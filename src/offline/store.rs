//! Local record store
//!
//! Records are kept as JSON payloads, one row per record, in the order the
//! remote returned them.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::marker::PhantomData;
use std::path::Path;

use super::{OfflineRecord, OfflineResult};
use crate::db::SqliteDatabase;

#[async_trait]
pub trait LocalStore<T: OfflineRecord>: Send + Sync {
    /// All stored records, in stored order
    async fn read_all(&self) -> OfflineResult<Vec<T>>;

    /// Replace the stored collection and stamp the sync time
    async fn replace_all(&self, records: &[T], synced_at: DateTime<Utc>) -> OfflineResult<()>;

    async fn last_synced_at(&self) -> OfflineResult<Option<DateTime<Utc>>>;

    async fn clear(&self) -> OfflineResult<()>;
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS offline_records (
        collection TEXT NOT NULL,
        record_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        payload TEXT NOT NULL,
        PRIMARY KEY (collection, record_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_offline_records_position ON offline_records(collection, position)",
    r#"
    CREATE TABLE IF NOT EXISTS offline_sync_state (
        collection TEXT PRIMARY KEY,
        last_synced_at TEXT NOT NULL
    )
    "#,
];

/// Open (creating if needed) the local mirror database and its tables
pub async fn open_local_pool(path: &Path) -> Result<SqlitePool> {
    let url = path
        .to_str()
        .with_context(|| format!("Local store path is not valid UTF-8: {:?}", path))?;
    let db = SqliteDatabase::new(url).await?;
    let pool = db.pool().clone();

    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .context("Failed to create offline store tables")?;
    }
    tracing::debug!(path = %path.display(), "Opened offline store");
    Ok(pool)
}

/// One collection inside the local mirror database
pub struct SqliteLocalStore<T> {
    pool: SqlitePool,
    collection: String,
    _record: PhantomData<fn() -> T>,
}

impl<T> SqliteLocalStore<T> {
    pub fn new(pool: SqlitePool, collection: &str) -> Self {
        Self {
            pool,
            collection: collection.to_string(),
            _record: PhantomData,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl<T: OfflineRecord> LocalStore<T> for SqliteLocalStore<T> {
    async fn read_all(&self) -> OfflineResult<Vec<T>> {
        let rows = sqlx::query(
            "SELECT payload FROM offline_records WHERE collection = ? ORDER BY position",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: String = row.try_get("payload")?;
            records.push(serde_json::from_str(&payload)?);
        }
        Ok(records)
    }

    async fn replace_all(&self, records: &[T], synced_at: DateTime<Utc>) -> OfflineResult<()> {
        // Serialize first so a bad record leaves the stored copy untouched
        let payloads = records
            .iter()
            .map(|r| -> OfflineResult<(String, String)> { Ok((r.record_id(), serde_json::to_string(r)?)) })
            .collect::<OfflineResult<Vec<_>>>()?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM offline_records WHERE collection = ?")
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;

        for (position, (record_id, payload)) in payloads.iter().enumerate() {
            sqlx::query(
                "INSERT OR REPLACE INTO offline_records (collection, record_id, position, payload) VALUES (?, ?, ?, ?)",
            )
            .bind(&self.collection)
            .bind(record_id)
            .bind(position as i64)
            .bind(payload)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO offline_sync_state (collection, last_synced_at) VALUES (?, ?)
            ON CONFLICT(collection) DO UPDATE SET last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(&self.collection)
        .bind(synced_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn last_synced_at(&self) -> OfflineResult<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT last_synced_at FROM offline_sync_state WHERE collection = ?")
            .bind(&self.collection)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row
            .map(|r| r.try_get::<String, _>("last_synced_at"))
            .transpose()?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }

    async fn clear(&self) -> OfflineResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM offline_records WHERE collection = ?")
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM offline_sync_state WHERE collection = ?")
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StudyNote, Video};
    use tempfile::TempDir;

    async fn setup_pool() -> (TempDir, SqlitePool) {
        let dir = TempDir::new().unwrap();
        let pool = open_local_pool(&dir.path().join("mirror/offline.db")).await.unwrap();
        (dir, pool)
    }

    fn video(id: i64, title: &str) -> Video {
        let mut v = Video::new(title.to_string(), "dQw4w9WgXcQ".to_string());
        v.id = id;
        v
    }

    #[tokio::test]
    async fn test_empty_store() {
        let (_dir, pool) = setup_pool().await;
        let store: SqliteLocalStore<Video> = SqliteLocalStore::new(pool, "videos");
        assert!(store.read_all().await.unwrap().is_empty());
        assert!(store.last_synced_at().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_all_keeps_order_and_stamp() {
        let (_dir, pool) = setup_pool().await;
        let store: SqliteLocalStore<Video> = SqliteLocalStore::new(pool, "videos");

        let stamp = Utc::now();
        store
            .replace_all(&[video(3, "c"), video(1, "a"), video(2, "b")], stamp)
            .await
            .unwrap();
        let titles: Vec<String> = store.read_all().await.unwrap().into_iter().map(|v| v.title).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
        let synced = store.last_synced_at().await.unwrap().unwrap();
        assert_eq!(synced.timestamp(), stamp.timestamp());

        // A second sync replaces rather than merges
        store.replace_all(&[video(9, "z")], Utc::now()).await.unwrap();
        let all = store.read_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, 9);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let (_dir, pool) = setup_pool().await;
        let videos: SqliteLocalStore<Video> = SqliteLocalStore::new(pool.clone(), "videos");
        let notes: SqliteLocalStore<StudyNote> = SqliteLocalStore::new(pool, "notes");

        videos.replace_all(&[video(1, "a")], Utc::now()).await.unwrap();
        let mut note = StudyNote::new("n".into(), "body".into(), "<p>body</p>".into());
        note.id = 1;
        notes.replace_all(&[note], Utc::now()).await.unwrap();

        videos.clear().await.unwrap();
        assert!(videos.read_all().await.unwrap().is_empty());
        assert!(videos.last_synced_at().await.unwrap().is_none());
        assert_eq!(notes.read_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("offline.db");
        {
            let pool = open_local_pool(&path).await.unwrap();
            let store: SqliteLocalStore<Video> = SqliteLocalStore::new(pool.clone(), "videos");
            store.replace_all(&[video(1, "kept")], Utc::now()).await.unwrap();
            pool.close().await;
        }
        let pool = open_local_pool(&path).await.unwrap();
        let store: SqliteLocalStore<Video> = SqliteLocalStore::new(pool, "videos");
        assert_eq!(store.read_all().await.unwrap()[0].title, "kept");
    }
}
