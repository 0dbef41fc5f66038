//! Study note repository

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::{NoteFilter, StudyNote};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::query::{bind_mysql, bind_sqlite, tags_from_json, tags_to_json, Filters};

const NOTE_COLUMNS: &str = "id, title, content, content_html, video_id, tags, created_at, updated_at";

#[async_trait]
pub trait NoteRepository: Send + Sync {
    async fn create(&self, note: &StudyNote) -> Result<StudyNote>;
    async fn get_by_id(&self, id: i64) -> Result<Option<StudyNote>>;
    async fn list(&self, filter: &NoteFilter, order_by: &str, offset: i64, limit: i64) -> Result<Vec<StudyNote>>;
    async fn count(&self, filter: &NoteFilter) -> Result<i64>;
    async fn update(&self, note: &StudyNote) -> Result<StudyNote>;
    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxNoteRepository {
    pool: DynDatabasePool,
}

impl SqlxNoteRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NoteRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NoteRepository for SqlxNoteRepository {
    async fn create(&self, note: &StudyNote) -> Result<StudyNote> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_note_sqlite(sqlite(&self.pool)?, note).await,
            DatabaseDriver::Mysql => create_note_mysql(mysql(&self.pool)?, note).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<StudyNote>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_note_by_id_sqlite(sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_note_by_id_mysql(mysql(&self.pool)?, id).await,
        }
    }

    async fn list(&self, filter: &NoteFilter, order_by: &str, offset: i64, limit: i64) -> Result<Vec<StudyNote>> {
        let filters = note_filters(filter);
        let sql = format!(
            "SELECT {} FROM study_notes{} ORDER BY {} LIMIT ? OFFSET ?",
            NOTE_COLUMNS,
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
                    .context("Failed to list notes")?;
                rows.iter().map(row_to_note_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&sql), filters.values())
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(mysql(&self.pool)?)
                    .await
                    .context("Failed to list notes")?;
                rows.iter().map(row_to_note_mysql).collect()
            }
        }
    }

    async fn count(&self, filter: &NoteFilter) -> Result<i64> {
        let filters = note_filters(filter);
        let sql = format!("SELECT COUNT(*) as count FROM study_notes{}", filters.where_sql());
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_sqlite(sqlx::query(&sql), filters.values())
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count notes")?
                .get("count"),
            DatabaseDriver::Mysql => bind_mysql(sqlx::query(&sql), filters.values())
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count notes")?
                .get("count"),
        };
        Ok(count)
    }

    async fn update(&self, note: &StudyNote) -> Result<StudyNote> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_note_sqlite(sqlite(&self.pool)?, note).await,
            DatabaseDriver::Mysql => update_note_mysql(mysql(&self.pool)?, note).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query("DELETE FROM study_notes WHERE id = ?")
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to delete note")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query("DELETE FROM study_notes WHERE id = ?")
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to delete note")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

fn note_filters(filter: &NoteFilter) -> Filters {
    let mut filters = Filters::new();
    if let Some(video_id) = filter.video_id {
        filters.eq("video_id", video_id);
    }
    if let Some(tag) = &filter.tag {
        filters.has_tag("tags", tag);
    }
    if let Some(search) = &filter.search {
        filters.search(&["title", "content"], search);
    }
    filters
}

// SQLite implementations
async fn create_note_sqlite(pool: &SqlitePool, note: &StudyNote) -> Result<StudyNote> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO study_notes (title, content, content_html, video_id, tags, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&note.title)
    .bind(&note.content)
    .bind(&note.content_html)
    .bind(note.video_id)
    .bind(tags_to_json(&note.tags))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create note")?;

    Ok(StudyNote {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..note.clone()
    })
}

async fn get_note_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<StudyNote>> {
    let sql = format!("SELECT {} FROM study_notes WHERE id = ?", NOTE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get note")?;
    row.as_ref().map(row_to_note_sqlite).transpose()
}

async fn update_note_sqlite(pool: &SqlitePool, note: &StudyNote) -> Result<StudyNote> {
    sqlx::query(
        "UPDATE study_notes SET title = ?, content = ?, content_html = ?, video_id = ?, tags = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&note.title)
    .bind(&note.content)
    .bind(&note.content_html)
    .bind(note.video_id)
    .bind(tags_to_json(&note.tags))
    .bind(Utc::now())
    .bind(note.id)
    .execute(pool)
    .await
    .context("Failed to update note")?;
    get_note_by_id_sqlite(pool, note.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Note not found after update"))
}

fn row_to_note_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<StudyNote> {
    let tags: String = row.get("tags");
    Ok(StudyNote {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        video_id: row.get("video_id"),
        tags: tags_from_json(&tags),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// MySQL implementations
async fn create_note_mysql(pool: &MySqlPool, note: &StudyNote) -> Result<StudyNote> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO study_notes (title, content, content_html, video_id, tags, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&note.title)
    .bind(&note.content)
    .bind(&note.content_html)
    .bind(note.video_id)
    .bind(tags_to_json(&note.tags))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create note")?;

    Ok(StudyNote {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..note.clone()
    })
}

async fn get_note_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<StudyNote>> {
    let sql = format!("SELECT {} FROM study_notes WHERE id = ?", NOTE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get note")?;
    row.as_ref().map(row_to_note_mysql).transpose()
}

async fn update_note_mysql(pool: &MySqlPool, note: &StudyNote) -> Result<StudyNote> {
    sqlx::query(
        "UPDATE study_notes SET title = ?, content = ?, content_html = ?, video_id = ?, tags = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&note.title)
    .bind(&note.content)
    .bind(&note.content_html)
    .bind(note.video_id)
    .bind(tags_to_json(&note.tags))
    .bind(Utc::now())
    .bind(note.id)
    .execute(pool)
    .await
    .context("Failed to update note")?;
    get_note_by_id_mysql(pool, note.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Note not found after update"))
}

fn row_to_note_mysql(row: &sqlx::mysql::MySqlRow) -> Result<StudyNote> {
    let tags: String = row.get("tags");
    Ok(StudyNote {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        video_id: row.get("video_id"),
        tags: tags_from_json(&tags),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
