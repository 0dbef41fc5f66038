//! Video repository

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::{Video, VideoFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::query::{bind_mysql, bind_sqlite, tags_from_json, tags_to_json, Filters, SqlValue};

const VIDEO_COLUMNS: &str = "id, title, youtube_id, url, description, channel, duration_seconds, tags, published, created_at, updated_at";

#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn create(&self, video: &Video) -> Result<Video>;
    async fn get_by_id(&self, id: i64) -> Result<Option<Video>>;
    async fn get_by_youtube_id(&self, youtube_id: &str) -> Result<Option<Video>>;
    async fn list(&self, filter: &VideoFilter, order_by: &str, offset: i64, limit: i64) -> Result<Vec<Video>>;
    async fn count(&self, filter: &VideoFilter) -> Result<i64>;
    async fn update(&self, video: &Video) -> Result<Video>;

    /// Delete a video after detaching its notes, in one transaction.
    /// Returns `None` when the video does not exist, otherwise the number
    /// of notes that were detached.
    async fn delete(&self, id: i64) -> Result<Option<u64>>;
}

pub struct SqlxVideoRepository {
    pool: DynDatabasePool,
}

impl SqlxVideoRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn VideoRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl VideoRepository for SqlxVideoRepository {
    async fn create(&self, video: &Video) -> Result<Video> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_video_sqlite(sqlite(&self.pool)?, video).await,
            DatabaseDriver::Mysql => create_video_mysql(mysql(&self.pool)?, video).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Video>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_video_by_sqlite(sqlite(&self.pool)?, "id", id.into()).await,
            DatabaseDriver::Mysql => get_video_by_mysql(mysql(&self.pool)?, "id", id.into()).await,
        }
    }

    async fn get_by_youtube_id(&self, youtube_id: &str) -> Result<Option<Video>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_video_by_sqlite(sqlite(&self.pool)?, "youtube_id", youtube_id.into()).await
            }
            DatabaseDriver::Mysql => {
                get_video_by_mysql(mysql(&self.pool)?, "youtube_id", youtube_id.into()).await
            }
        }
    }

    async fn list(&self, filter: &VideoFilter, order_by: &str, offset: i64, limit: i64) -> Result<Vec<Video>> {
        let filters = video_filters(filter);
        let sql = format!(
            "SELECT {} FROM videos{} ORDER BY {} LIMIT ? OFFSET ?",
            VIDEO_COLUMNS,
            filters.where_sql(),
            order_by
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_sqlite(sqlx::query(&sql), filters.values())
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(sqlite(&self.pool)?)
                    .await
                    .context("Failed to list videos")?;
                rows.iter().map(row_to_video_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&sql), filters.values())
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(mysql(&self.pool)?)
                    .await
                    .context("Failed to list videos")?;
                rows.iter().map(row_to_video_mysql).collect()
            }
        }
    }

    async fn count(&self, filter: &VideoFilter) -> Result<i64> {
        let filters = video_filters(filter);
        let sql = format!("SELECT COUNT(*) as count FROM videos{}", filters.where_sql());
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_sqlite(sqlx::query(&sql), filters.values())
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count videos")?
                .get("count"),
            DatabaseDriver::Mysql => bind_mysql(sqlx::query(&sql), filters.values())
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count videos")?
                .get("count"),
        };
        Ok(count)
    }

    async fn update(&self, video: &Video) -> Result<Video> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_video_sqlite(sqlite(&self.pool)?, video).await,
            DatabaseDriver::Mysql => update_video_mysql(mysql(&self.pool)?, video).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<Option<u64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_video_sqlite(sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => delete_video_mysql(mysql(&self.pool)?, id).await,
        }
    }
}

fn video_filters(filter: &VideoFilter) -> Filters {
    let mut filters = Filters::new();
    if let Some(published) = filter.published {
        filters.eq("published", published);
    }
    if let Some(tag) = &filter.tag {
        filters.has_tag("tags", tag);
    }
    if let Some(search) = &filter.search {
        filters.search(&["title", "description", "channel"], search);
    }
    filters
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_video_sqlite(pool: &SqlitePool, video: &Video) -> Result<Video> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO videos (title, youtube_id, url, description, channel, duration_seconds, tags, published, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&video.title)
    .bind(&video.youtube_id)
    .bind(&video.url)
    .bind(&video.description)
    .bind(&video.channel)
    .bind(video.duration_seconds)
    .bind(tags_to_json(&video.tags))
    .bind(video.published)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create video")?;

    Ok(Video {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..video.clone()
    })
}

async fn get_video_by_sqlite(pool: &SqlitePool, column: &str, value: SqlValue) -> Result<Option<Video>> {
    let sql = format!("SELECT {} FROM videos WHERE {} = ?", VIDEO_COLUMNS, column);
    let row = bind_sqlite(sqlx::query(&sql), &[value])
        .fetch_optional(pool)
        .await
        .context("Failed to get video")?;
    row.as_ref().map(row_to_video_sqlite).transpose()
}

async fn update_video_sqlite(pool: &SqlitePool, video: &Video) -> Result<Video> {
    sqlx::query(
        r#"
        UPDATE videos
        SET title = ?, youtube_id = ?, url = ?, description = ?, channel = ?, duration_seconds = ?, tags = ?, published = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&video.title)
    .bind(&video.youtube_id)
    .bind(&video.url)
    .bind(&video.description)
    .bind(&video.channel)
    .bind(video.duration_seconds)
    .bind(tags_to_json(&video.tags))
    .bind(video.published)
    .bind(Utc::now())
    .bind(video.id)
    .execute(pool)
    .await
    .context("Failed to update video")?;

    get_video_by_sqlite(pool, "id", video.id.into())
        .await?
        .ok_or_else(|| anyhow::anyhow!("Video not found after update"))
}

async fn delete_video_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<u64>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let detached = sqlx::query("UPDATE study_notes SET video_id = NULL WHERE video_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to detach notes")?
        .rows_affected();
    let deleted = sqlx::query("DELETE FROM videos WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete video")?
        .rows_affected();

    tx.commit().await.context("Failed to commit video delete")?;
    Ok((deleted > 0).then_some(detached))
}

fn row_to_video_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Video> {
    let tags: String = row.get("tags");
    Ok(Video {
        id: row.get("id"),
        title: row.get("title"),
        youtube_id: row.get("youtube_id"),
        url: row.get("url"),
        description: row.get("description"),
        channel: row.get("channel"),
        duration_seconds: row.get("duration_seconds"),
        tags: tags_from_json(&tags),
        published: row.get("published"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_video_mysql(pool: &MySqlPool, video: &Video) -> Result<Video> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO videos (title, youtube_id, url, description, channel, duration_seconds, tags, published, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&video.title)
    .bind(&video.youtube_id)
    .bind(&video.url)
    .bind(&video.description)
    .bind(&video.channel)
    .bind(video.duration_seconds)
    .bind(tags_to_json(&video.tags))
    .bind(video.published)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create video")?;

    Ok(Video {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..video.clone()
    })
}

async fn get_video_by_mysql(pool: &MySqlPool, column: &str, value: SqlValue) -> Result<Option<Video>> {
    let sql = format!("SELECT {} FROM videos WHERE {} = ?", VIDEO_COLUMNS, column);
    let row = bind_mysql(sqlx::query(&sql), &[value])
        .fetch_optional(pool)
        .await
        .context("Failed to get video")?;
    row.as_ref().map(row_to_video_mysql).transpose()
}

async fn update_video_mysql(pool: &MySqlPool, video: &Video) -> Result<Video> {
    sqlx::query(
        r#"
        UPDATE videos
        SET title = ?, youtube_id = ?, url = ?, description = ?, channel = ?, duration_seconds = ?, tags = ?, published = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&video.title)
    .bind(&video.youtube_id)
    .bind(&video.url)
    .bind(&video.description)
    .bind(&video.channel)
    .bind(video.duration_seconds)
    .bind(tags_to_json(&video.tags))
    .bind(video.published)
    .bind(Utc::now())
    .bind(video.id)
    .execute(pool)
    .await
    .context("Failed to update video")?;

    get_video_by_mysql(pool, "id", video.id.into())
        .await?
        .ok_or_else(|| anyhow::anyhow!("Video not found after update"))
}

async fn delete_video_mysql(pool: &MySqlPool, id: i64) -> Result<Option<u64>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let detached = sqlx::query("UPDATE study_notes SET video_id = NULL WHERE video_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to detach notes")?
        .rows_affected();
    let deleted = sqlx::query("DELETE FROM videos WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete video")?
        .rows_affected();

    tx.commit().await.context("Failed to commit video delete")?;
    Ok((deleted > 0).then_some(detached))
}

fn row_to_video_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Video> {
    let tags: String = row.get("tags");
    Ok(Video {
        id: row.get("id"),
        title: row.get("title"),
        youtube_id: row.get("youtube_id"),
        url: row.get("url"),
        description: row.get("description"),
        channel: row.get("channel"),
        duration_seconds: row.get("duration_seconds"),
        tags: tags_from_json(&tags),
        published: row.get("published"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
