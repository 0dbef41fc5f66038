//! Application module repository

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::{AppModule, ModuleFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::query::{bind_mysql, bind_sqlite, Filters, SqlValue};

const MODULE_COLUMNS: &str =
    "id, module_key, name, description, route, icon, enabled, sort_order, created_at, updated_at";

#[async_trait]
pub trait ModuleRepository: Send + Sync {
    async fn create(&self, module: &AppModule) -> Result<AppModule>;
    async fn get_by_id(&self, id: i64) -> Result<Option<AppModule>>;
    async fn get_by_key(&self, key: &str) -> Result<Option<AppModule>>;
    async fn list(&self, filter: &ModuleFilter, order_by: &str, offset: i64, limit: i64) -> Result<Vec<AppModule>>;
    async fn count(&self, filter: &ModuleFilter) -> Result<i64>;
    async fn update(&self, module: &AppModule) -> Result<AppModule>;
    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxModuleRepository {
    pool: DynDatabasePool,
}

impl SqlxModuleRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ModuleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ModuleRepository for SqlxModuleRepository {
    async fn create(&self, module: &AppModule) -> Result<AppModule> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(sqlite(&self.pool)?, module).await,
            DatabaseDriver::Mysql => create_mysql(mysql(&self.pool)?, module).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<AppModule>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_sqlite(sqlite(&self.pool)?, "id", id.into()).await,
            DatabaseDriver::Mysql => get_by_mysql(mysql(&self.pool)?, "id", id.into()).await,
        }
    }

    async fn get_by_key(&self, key: &str) -> Result<Option<AppModule>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_sqlite(sqlite(&self.pool)?, "module_key", key.into()).await,
            DatabaseDriver::Mysql => get_by_mysql(mysql(&self.pool)?, "module_key", key.into()).await,
        }
    }

    async fn list(&self, filter: &ModuleFilter, order_by: &str, offset: i64, limit: i64) -> Result<Vec<AppModule>> {
        let filters = module_filters(filter);
        let sql = format!(
            "SELECT {} FROM app_modules{} ORDER BY {} LIMIT ? OFFSET ?",
            MODULE_COLUMNS,
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
                    .context("Failed to list modules")?;
                rows.iter().map(row_to_module_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&sql), filters.values())
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(mysql(&self.pool)?)
                    .await
                    .context("Failed to list modules")?;
                rows.iter().map(row_to_module_mysql).collect()
            }
        }
    }

    async fn count(&self, filter: &ModuleFilter) -> Result<i64> {
        let filters = module_filters(filter);
        let sql = format!("SELECT COUNT(*) as count FROM app_modules{}", filters.where_sql());
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_sqlite(sqlx::query(&sql), filters.values())
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count modules")?
                .get("count"),
            DatabaseDriver::Mysql => bind_mysql(sqlx::query(&sql), filters.values())
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count modules")?
                .get("count"),
        };
        Ok(count)
    }

    async fn update(&self, module: &AppModule) -> Result<AppModule> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(sqlite(&self.pool)?, module).await,
            DatabaseDriver::Mysql => update_mysql(mysql(&self.pool)?, module).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query("DELETE FROM app_modules WHERE id = ?")
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to delete module")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query("DELETE FROM app_modules WHERE id = ?")
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to delete module")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

fn module_filters(filter: &ModuleFilter) -> Filters {
    let mut filters = Filters::new();
    if let Some(enabled) = filter.enabled {
        filters.eq("enabled", enabled);
    }
    filters
}

// SQLite implementations
async fn create_sqlite(pool: &SqlitePool, module: &AppModule) -> Result<AppModule> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO app_modules (module_key, name, description, route, icon, enabled, sort_order, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&module.key)
    .bind(&module.name)
    .bind(&module.description)
    .bind(&module.route)
    .bind(&module.icon)
    .bind(module.enabled)
    .bind(module.sort_order)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create module")?;

    Ok(AppModule {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..module.clone()
    })
}

async fn get_by_sqlite(
    pool: &SqlitePool,
    column: &str,
    value: SqlValue,
) -> Result<Option<AppModule>> {
    let sql = format!("SELECT {} FROM app_modules WHERE {} = ?", MODULE_COLUMNS, column);
    let row = bind_sqlite(sqlx::query(&sql), &[value])
        .fetch_optional(pool)
        .await
        .context("Failed to get module")?;
    row.as_ref().map(row_to_module_sqlite).transpose()
}

async fn update_sqlite(pool: &SqlitePool, module: &AppModule) -> Result<AppModule> {
    sqlx::query(
        "UPDATE app_modules SET module_key = ?, name = ?, description = ?, route = ?, icon = ?, enabled = ?, sort_order = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&module.key)
    .bind(&module.name)
    .bind(&module.description)
    .bind(&module.route)
    .bind(&module.icon)
    .bind(module.enabled)
    .bind(module.sort_order)
    .bind(Utc::now())
    .bind(module.id)
    .execute(pool)
    .await
    .context("Failed to update module")?;
    get_by_sqlite(pool, "id", module.id.into())
        .await?
        .ok_or_else(|| anyhow::anyhow!("Module not found after update"))
}

fn row_to_module_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<AppModule> {
    Ok(AppModule {
        id: row.get("id"),
        key: row.get("module_key"),
        name: row.get("name"),
        description: row.get("description"),
        route: row.get("route"),
        icon: row.get("icon"),
        enabled: row.get("enabled"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// MySQL implementations
async fn create_mysql(pool: &MySqlPool, module: &AppModule) -> Result<AppModule> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO app_modules (module_key, name, description, route, icon, enabled, sort_order, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&module.key)
    .bind(&module.name)
    .bind(&module.description)
    .bind(&module.route)
    .bind(&module.icon)
    .bind(module.enabled)
    .bind(module.sort_order)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create module")?;

    Ok(AppModule {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..module.clone()
    })
}

async fn get_by_mysql(
    pool: &MySqlPool,
    column: &str,
    value: SqlValue,
) -> Result<Option<AppModule>> {
    let sql = format!("SELECT {} FROM app_modules WHERE {} = ?", MODULE_COLUMNS, column);
    let row = bind_mysql(sqlx::query(&sql), &[value])
        .fetch_optional(pool)
        .await
        .context("Failed to get module")?;
    row.as_ref().map(row_to_module_mysql).transpose()
}

async fn update_mysql(pool: &MySqlPool, module: &AppModule) -> Result<AppModule> {
    sqlx::query(
        "UPDATE app_modules SET module_key = ?, name = ?, description = ?, route = ?, icon = ?, enabled = ?, sort_order = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&module.key)
    .bind(&module.name)
    .bind(&module.description)
    .bind(&module.route)
    .bind(&module.icon)
    .bind(module.enabled)
    .bind(module.sort_order)
    .bind(Utc::now())
    .bind(module.id)
    .execute(pool)
    .await
    .context("Failed to update module")?;
    get_by_mysql(pool, "id", module.id.into())
        .await?
        .ok_or_else(|| anyhow::anyhow!("Module not found after update"))
}

fn row_to_module_mysql(row: &sqlx::mysql::MySqlRow) -> Result<AppModule> {
    Ok(AppModule {
        id: row.get("id"),
        key: row.get("module_key"),
        name: row.get("name"),
        description: row.get("description"),
        route: row.get("route"),
        icon: row.get("icon"),
        enabled: row.get("enabled"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
