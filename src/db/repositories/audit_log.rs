//! Audit log repository
//!
//! Entries are only ever appended or purged by age.

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::{AuditFilter, AuditLog, NewAuditLog};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::query::{bind_mysql, bind_sqlite, Filters};

const AUDIT_COLUMNS: &str = "id, actor, action, entity_type, entity_id, details, created_at";

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append an entry
    async fn create(&self, entry: &NewAuditLog) -> Result<AuditLog>;

    async fn get_by_id(&self, id: i64) -> Result<Option<AuditLog>>;

    async fn list(&self, filter: &AuditFilter, order_by: &str, offset: i64, limit: i64) -> Result<Vec<AuditLog>>;

    async fn count(&self, filter: &AuditFilter) -> Result<i64>;

    /// Delete entries created strictly before `cutoff`, returning how many went
    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

pub struct SqlxAuditLogRepository {
    pool: DynDatabasePool,
}

impl SqlxAuditLogRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AuditLogRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AuditLogRepository for SqlxAuditLogRepository {
    async fn create(&self, entry: &NewAuditLog) -> Result<AuditLog> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(sqlite(&self.pool)?, entry).await,
            DatabaseDriver::Mysql => create_mysql(mysql(&self.pool)?, entry).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<AuditLog>> {
        let sql = format!("SELECT {} FROM audit_logs WHERE id = ?", AUDIT_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(sqlite(&self.pool)?)
                    .await
                    .context("Failed to get audit log")?;
                row.as_ref().map(row_to_audit_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(mysql(&self.pool)?)
                    .await
                    .context("Failed to get audit log")?;
                row.as_ref().map(row_to_audit_mysql).transpose()
            }
        }
    }

    async fn list(&self, filter: &AuditFilter, order_by: &str, offset: i64, limit: i64) -> Result<Vec<AuditLog>> {
        let filters = audit_filters(filter);
        let sql = format!(
            "SELECT {} FROM audit_logs{} ORDER BY {} LIMIT ? OFFSET ?",
            AUDIT_COLUMNS,
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
                    .context("Failed to list audit logs")?;
                rows.iter().map(row_to_audit_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&sql), filters.values())
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(mysql(&self.pool)?)
                    .await
                    .context("Failed to list audit logs")?;
                rows.iter().map(row_to_audit_mysql).collect()
            }
        }
    }

    async fn count(&self, filter: &AuditFilter) -> Result<i64> {
        let filters = audit_filters(filter);
        let sql = format!("SELECT COUNT(*) as count FROM audit_logs{}", filters.where_sql());
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_sqlite(sqlx::query(&sql), filters.values())
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count audit logs")?
                .get("count"),
            DatabaseDriver::Mysql => bind_mysql(sqlx::query(&sql), filters.values())
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count audit logs")?
                .get("count"),
        };
        Ok(count)
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let sql = "DELETE FROM audit_logs WHERE created_at < ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(cutoff)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to purge audit logs")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(cutoff)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to purge audit logs")?
                .rows_affected(),
        };
        Ok(affected)
    }
}

fn audit_filters(filter: &AuditFilter) -> Filters {
    let mut filters = Filters::new();
    if let Some(entity_type) = &filter.entity_type {
        filters.eq("entity_type", entity_type.as_str());
    }
    if let Some(entity_id) = filter.entity_id {
        filters.eq("entity_id", entity_id);
    }
    if let Some(action) = &filter.action {
        filters.eq("action", action.to_lowercase());
    }
    if let Some(actor) = &filter.actor {
        filters.eq("actor", actor.as_str());
    }
    filters
}

fn parse_details(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

// SQLite implementations
async fn create_sqlite(pool: &SqlitePool, entry: &NewAuditLog) -> Result<AuditLog> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO audit_logs (actor, action, entity_type, entity_id, details, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&entry.actor)
    .bind(entry.action.to_string())
    .bind(&entry.entity_type)
    .bind(entry.entity_id)
    .bind(entry.details.to_string())
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create audit log")?;

    Ok(AuditLog {
        id: result.last_insert_rowid(),
        actor: entry.actor.clone(),
        action: entry.action,
        entity_type: entry.entity_type.clone(),
        entity_id: entry.entity_id,
        details: entry.details.clone(),
        created_at: now,
    })
}

fn row_to_audit_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<AuditLog> {
    let action: String = row.get("action");
    let details: String = row.get("details");
    Ok(AuditLog {
        id: row.get("id"),
        actor: row.get("actor"),
        action: action.parse()?,
        entity_type: row.get("entity_type"),
        entity_id: row.get("entity_id"),
        details: parse_details(&details),
        created_at: row.get("created_at"),
    })
}

// MySQL implementations
async fn create_mysql(pool: &MySqlPool, entry: &NewAuditLog) -> Result<AuditLog> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO audit_logs (actor, action, entity_type, entity_id, details, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&entry.actor)
    .bind(entry.action.to_string())
    .bind(&entry.entity_type)
    .bind(entry.entity_id)
    .bind(entry.details.to_string())
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create audit log")?;

    Ok(AuditLog {
        id: result.last_insert_id() as i64,
        actor: entry.actor.clone(),
        action: entry.action,
        entity_type: entry.entity_type.clone(),
        entity_id: entry.entity_id,
        details: entry.details.clone(),
        created_at: now,
    })
}

fn row_to_audit_mysql(row: &sqlx::mysql::MySqlRow) -> Result<AuditLog> {
    let action: String = row.get("action");
    let details: String = row.get("details");
    Ok(AuditLog {
        id: row.get("id"),
        actor: row.get("actor"),
        action: action.parse()?,
        entity_type: row.get("entity_type"),
        entity_id: row.get("entity_id"),
        details: parse_details(&details),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations::run_migrations};
    use crate::models::AuditAction;
    use chrono::Duration;

    async fn setup_test_repo() -> SqlxAuditLogRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        SqlxAuditLogRepository::new(pool)
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let repo = setup_test_repo().await;
        let entry = NewAuditLog::new("alice", AuditAction::Create, "video", Some(7))
            .with_details(serde_json::json!({"title": "Intro"}));
        let created = repo.create(&entry).await.unwrap();

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.actor, "alice");
        assert_eq!(found.action, AuditAction::Create);
        assert_eq!(found.entity_id, Some(7));
        assert_eq!(found.details["title"], "Intro");
    }

    #[tokio::test]
    async fn test_filters() {
        let repo = setup_test_repo().await;
        repo.create(&NewAuditLog::new("a", AuditAction::Create, "video", Some(1))).await.unwrap();
        repo.create(&NewAuditLog::new("a", AuditAction::Delete, "video", Some(1))).await.unwrap();
        repo.create(&NewAuditLog::new("b", AuditAction::Create, "note", Some(2))).await.unwrap();

        let videos = AuditFilter {
            entity_type: Some("video".to_string()),
            ..AuditFilter::default()
        };
        assert_eq!(repo.count(&videos).await.unwrap(), 2);

        let creates = AuditFilter {
            action: Some("CREATE".to_string()),
            ..AuditFilter::default()
        };
        let rows = repo.list(&creates, "created_at DESC, id DESC", 0, 10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].entity_type, "note");
    }

    #[tokio::test]
    async fn test_delete_before_cutoff() {
        let repo = setup_test_repo().await;
        repo.create(&NewAuditLog::new("a", AuditAction::Update, "user", Some(1))).await.unwrap();

        let past = Utc::now() - Duration::hours(1);
        assert_eq!(repo.delete_before(past).await.unwrap(), 0);

        let future = Utc::now() + Duration::seconds(1);
        assert_eq!(repo.delete_before(future).await.unwrap(), 1);
        assert_eq!(repo.count(&AuditFilter::default()).await.unwrap(), 0);
    }
}
