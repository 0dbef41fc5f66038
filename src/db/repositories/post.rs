//! Blog post repository

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::{Post, PostFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::query::{bind_mysql, bind_sqlite, tags_from_json, tags_to_json, Filters, SqlValue};

const POST_COLUMNS: &str = "id, slug, title, excerpt, content, content_html, cover_image, status, tags, published_at, created_at, updated_at";

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: &Post) -> Result<Post>;
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>>;
    async fn list(&self, filter: &PostFilter, order_by: &str, offset: i64, limit: i64) -> Result<Vec<Post>>;
    async fn count(&self, filter: &PostFilter) -> Result<i64>;
    async fn update(&self, post: &Post) -> Result<Post>;
    async fn delete(&self, id: i64) -> Result<bool>;
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;
}

pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(sqlite(&self.pool)?, post).await,
            DatabaseDriver::Mysql => create_mysql(mysql(&self.pool)?, post).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_sqlite(sqlite(&self.pool)?, "id", id.into()).await,
            DatabaseDriver::Mysql => get_by_mysql(mysql(&self.pool)?, "id", id.into()).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_sqlite(sqlite(&self.pool)?, "slug", slug.into()).await,
            DatabaseDriver::Mysql => get_by_mysql(mysql(&self.pool)?, "slug", slug.into()).await,
        }
    }

    async fn list(&self, filter: &PostFilter, order_by: &str, offset: i64, limit: i64) -> Result<Vec<Post>> {
        let filters = post_filters(filter);
        let sql = format!(
            "SELECT {} FROM posts{} ORDER BY {} LIMIT ? OFFSET ?",
            POST_COLUMNS,
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
                    .context("Failed to list posts")?;
                rows.iter().map(row_to_post_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&sql), filters.values())
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(mysql(&self.pool)?)
                    .await
                    .context("Failed to list posts")?;
                rows.iter().map(row_to_post_mysql).collect()
            }
        }
    }

    async fn count(&self, filter: &PostFilter) -> Result<i64> {
        let filters = post_filters(filter);
        let sql = format!("SELECT COUNT(*) as count FROM posts{}", filters.where_sql());
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_sqlite(sqlx::query(&sql), filters.values())
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count posts")?
                .get("count"),
            DatabaseDriver::Mysql => bind_mysql(sqlx::query(&sql), filters.values())
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count posts")?
                .get("count"),
        };
        Ok(count)
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(sqlite(&self.pool)?, post).await,
            DatabaseDriver::Mysql => update_mysql(mysql(&self.pool)?, post).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query("DELETE FROM posts WHERE id = ?")
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query("DELETE FROM posts WHERE id = ?")
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        let sql = "SELECT COUNT(*) as count FROM posts WHERE slug = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(slug)
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to check post slug existence")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(slug)
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to check post slug existence")?
                .get("count"),
        };
        Ok(count > 0)
    }
}

fn post_filters(filter: &PostFilter) -> Filters {
    let mut filters = Filters::new();
    if let Some(status) = &filter.status {
        filters.eq("status", status.to_lowercase());
    }
    if let Some(tag) = &filter.tag {
        filters.has_tag("tags", tag);
    }
    if let Some(search) = &filter.search {
        filters.search(&["title", "excerpt", "content"], search);
    }
    filters
}

// SQLite implementations
async fn create_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO posts (slug, title, excerpt, content, content_html, cover_image, status, tags, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.excerpt)
    .bind(&post.content)
    .bind(&post.content_html)
    .bind(&post.cover_image)
    .bind(post.status.to_string())
    .bind(tags_to_json(&post.tags))
    .bind(post.published_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..post.clone()
    })
}

async fn get_by_sqlite(pool: &SqlitePool, column: &str, value: SqlValue) -> Result<Option<Post>> {
    let sql = format!("SELECT {} FROM posts WHERE {} = ?", POST_COLUMNS, column);
    let row = bind_sqlite(sqlx::query(&sql), &[value])
        .fetch_optional(pool)
        .await
        .context("Failed to get post")?;
    row.as_ref().map(row_to_post_sqlite).transpose()
}

async fn update_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    sqlx::query(
        r#"
        UPDATE posts
        SET slug = ?, title = ?, excerpt = ?, content = ?, content_html = ?, cover_image = ?, status = ?, tags = ?, published_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.excerpt)
    .bind(&post.content)
    .bind(&post.content_html)
    .bind(&post.cover_image)
    .bind(post.status.to_string())
    .bind(tags_to_json(&post.tags))
    .bind(post.published_at)
    .bind(Utc::now())
    .bind(post.id)
    .execute(pool)
    .await
    .context("Failed to update post")?;
    get_by_sqlite(pool, "id", post.id.into())
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let status: String = row.get("status");
    let tags: String = row.get("tags");
    Ok(Post {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        cover_image: row.get("cover_image"),
        status: status.parse()?,
        tags: tags_from_json(&tags),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// MySQL implementations
async fn create_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO posts (slug, title, excerpt, content, content_html, cover_image, status, tags, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.excerpt)
    .bind(&post.content)
    .bind(&post.content_html)
    .bind(&post.cover_image)
    .bind(post.status.to_string())
    .bind(tags_to_json(&post.tags))
    .bind(post.published_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..post.clone()
    })
}

async fn get_by_mysql(pool: &MySqlPool, column: &str, value: SqlValue) -> Result<Option<Post>> {
    let sql = format!("SELECT {} FROM posts WHERE {} = ?", POST_COLUMNS, column);
    let row = bind_mysql(sqlx::query(&sql), &[value])
        .fetch_optional(pool)
        .await
        .context("Failed to get post")?;
    row.as_ref().map(row_to_post_mysql).transpose()
}

async fn update_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    sqlx::query(
        r#"
        UPDATE posts
        SET slug = ?, title = ?, excerpt = ?, content = ?, content_html = ?, cover_image = ?, status = ?, tags = ?, published_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.excerpt)
    .bind(&post.content)
    .bind(&post.content_html)
    .bind(&post.cover_image)
    .bind(post.status.to_string())
    .bind(tags_to_json(&post.tags))
    .bind(post.published_at)
    .bind(Utc::now())
    .bind(post.id)
    .execute(pool)
    .await
    .context("Failed to update post")?;
    get_by_mysql(pool, "id", post.id.into())
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    let status: String = row.get("status");
    let tags: String = row.get("tags");
    Ok(Post {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        cover_image: row.get("cover_image"),
        status: status.parse()?,
        tags: tags_from_json(&tags),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
