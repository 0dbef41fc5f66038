//! User repository
//!
//! Database operations for dashboard users.
//!
//! Users are soft-deleted: `soft_delete` stamps `deleted_at` and listing
//! skips those rows unless the filter asks for them.

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::{User, UserFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::query::{bind_mysql, bind_sqlite, Filters};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, status, created_at, updated_at, deleted_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID, including soft-deleted users
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by (lowercase) email, including soft-deleted users
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// List one page of users
    async fn list(&self, filter: &UserFilter, order_by: &str, offset: i64, limit: i64) -> Result<Vec<User>>;

    /// Count users matching a filter
    async fn count(&self, filter: &UserFilter) -> Result<i64>;

    /// Write every mutable column of a user
    async fn update(&self, user: &User) -> Result<User>;

    /// Stamp `deleted_at`; false when the user is missing or already deleted
    async fn soft_delete(&self, id: i64, at: DateTime<Utc>) -> Result<bool>;

    /// Clear `deleted_at`; false when the user is missing or not deleted
    async fn restore(&self, id: i64) -> Result<bool>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(sqlite(&self.pool)?, user).await,
            DatabaseDriver::Mysql => create_user_mysql(mysql(&self.pool)?, user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_user_by_id_sqlite(sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_user_by_id_mysql(mysql(&self.pool)?, id).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_user_by_email_sqlite(sqlite(&self.pool)?, email).await,
            DatabaseDriver::Mysql => get_user_by_email_mysql(mysql(&self.pool)?, email).await,
        }
    }

    async fn list(&self, filter: &UserFilter, order_by: &str, offset: i64, limit: i64) -> Result<Vec<User>> {
        let filters = user_filters(filter);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_users_sqlite(sqlite(&self.pool)?, &filters, order_by, offset, limit).await
            }
            DatabaseDriver::Mysql => {
                list_users_mysql(mysql(&self.pool)?, &filters, order_by, offset, limit).await
            }
        }
    }

    async fn count(&self, filter: &UserFilter) -> Result<i64> {
        let filters = user_filters(filter);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_users_sqlite(sqlite(&self.pool)?, &filters).await,
            DatabaseDriver::Mysql => count_users_mysql(mysql(&self.pool)?, &filters).await,
        }
    }

    async fn update(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_user_sqlite(sqlite(&self.pool)?, user).await,
            DatabaseDriver::Mysql => update_user_mysql(mysql(&self.pool)?, user).await,
        }
    }

    async fn soft_delete(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        let sql = "UPDATE users SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(at)
                .bind(at)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to soft delete user")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(at)
                .bind(at)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to soft delete user")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn restore(&self, id: i64) -> Result<bool> {
        let sql = "UPDATE users SET deleted_at = NULL, updated_at = ? WHERE id = ? AND deleted_at IS NOT NULL";
        let now = Utc::now();
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(now)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to restore user")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(now)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to restore user")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

fn user_filters(filter: &UserFilter) -> Filters {
    let mut filters = Filters::new();
    if !filter.include_deleted {
        filters.raw("deleted_at IS NULL");
    }
    if let Some(role) = &filter.role {
        filters.eq("role", role.to_lowercase());
    }
    if let Some(status) = &filter.status {
        filters.eq("status", status.to_lowercase());
    }
    if let Some(search) = &filter.search {
        filters.search(&["name", "email"], search);
    }
    filters
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, role, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.status.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
        ..user.clone()
    })
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;
    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn get_user_by_email_sqlite(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;
    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn list_users_sqlite(
    pool: &SqlitePool,
    filters: &Filters,
    order_by: &str,
    offset: i64,
    limit: i64,
) -> Result<Vec<User>> {
    let sql = format!(
        "SELECT {} FROM users{} ORDER BY {} LIMIT ? OFFSET ?",
        USER_COLUMNS,
        filters.where_sql(),
        order_by
    );
    let rows = bind_sqlite(sqlx::query(&sql), filters.values())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;
    rows.iter().map(row_to_user_sqlite).collect()
}

async fn count_users_sqlite(pool: &SqlitePool, filters: &Filters) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) as count FROM users{}", filters.where_sql());
    let row = bind_sqlite(sqlx::query(&sql), filters.values())
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;
    Ok(row.get("count"))
}

async fn update_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();
    sqlx::query(
        r#"
        UPDATE users
        SET name = ?, email = ?, password_hash = ?, role = ?, status = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.status.to_string())
    .bind(now)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    get_user_by_id_sqlite(pool, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role: String = row.get("role");
    let status: String = row.get("status");
    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: role.parse()?,
        status: status.parse()?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, role, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.status.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        deleted_at: None,
        ..user.clone()
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;
    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn get_user_by_email_mysql(pool: &MySqlPool, email: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;
    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn list_users_mysql(
    pool: &MySqlPool,
    filters: &Filters,
    order_by: &str,
    offset: i64,
    limit: i64,
) -> Result<Vec<User>> {
    let sql = format!(
        "SELECT {} FROM users{} ORDER BY {} LIMIT ? OFFSET ?",
        USER_COLUMNS,
        filters.where_sql(),
        order_by
    );
    let rows = bind_mysql(sqlx::query(&sql), filters.values())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;
    rows.iter().map(row_to_user_mysql).collect()
}

async fn count_users_mysql(pool: &MySqlPool, filters: &Filters) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) as count FROM users{}", filters.where_sql());
    let row = bind_mysql(sqlx::query(&sql), filters.values())
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;
    Ok(row.get("count"))
}

async fn update_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();
    sqlx::query(
        r#"
        UPDATE users
        SET name = ?, email = ?, password_hash = ?, role = ?, status = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.status.to_string())
    .bind(now)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    get_user_by_id_mysql(pool, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role: String = row.get("role");
    let status: String = row.get("status");
    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: role.parse()?,
        status: status.parse()?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    })
}
