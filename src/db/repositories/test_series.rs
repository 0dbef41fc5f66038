//! Test series repository
//!
//! Questions are stored as a JSON document alongside the series row.

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::{Question, TestSeries};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const SERIES_COLUMNS: &str =
    "id, title, description, duration_minutes, marks_per_question, negative_marks, questions, created_at";

#[async_trait]
pub trait TestSeriesRepository: Send + Sync {
    async fn create(&self, series: &TestSeries) -> Result<TestSeries>;
    async fn get_by_id(&self, id: i64) -> Result<Option<TestSeries>>;
    async fn list(&self, order_by: &str, offset: i64, limit: i64) -> Result<Vec<TestSeries>>;
    async fn count(&self) -> Result<i64>;
    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxTestSeriesRepository {
    pool: DynDatabasePool,
}

impl SqlxTestSeriesRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TestSeriesRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TestSeriesRepository for SqlxTestSeriesRepository {
    async fn create(&self, series: &TestSeries) -> Result<TestSeries> {
        let now = Utc::now();
        let questions = serde_json::to_string(&series.questions).context("Failed to encode questions")?;
        let sql = "INSERT INTO test_series (title, description, duration_minutes, marks_per_question, negative_marks, questions, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)";

        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&series.title)
                .bind(&series.description)
                .bind(series.duration_minutes as i64)
                .bind(series.marks_per_question)
                .bind(series.negative_marks)
                .bind(&questions)
                .bind(now)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to create test series")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&series.title)
                .bind(&series.description)
                .bind(series.duration_minutes as i64)
                .bind(series.marks_per_question)
                .bind(series.negative_marks)
                .bind(&questions)
                .bind(now)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to create test series")?
                .last_insert_id() as i64,
        };

        Ok(TestSeries {
            id,
            created_at: now,
            ..series.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<TestSeries>> {
        let sql = format!("SELECT {} FROM test_series WHERE id = ?", SERIES_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(sqlite(&self.pool)?)
                    .await
                    .context("Failed to get test series")?;
                row.as_ref().map(row_to_series_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(mysql(&self.pool)?)
                    .await
                    .context("Failed to get test series")?;
                row.as_ref().map(row_to_series_mysql).transpose()
            }
        }
    }

    async fn list(&self, order_by: &str, offset: i64, limit: i64) -> Result<Vec<TestSeries>> {
        let sql = format!(
            "SELECT {} FROM test_series ORDER BY {} LIMIT ? OFFSET ?",
            SERIES_COLUMNS, order_by
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(sqlite(&self.pool)?)
                    .await
                    .context("Failed to list test series")?;
                rows.iter().map(row_to_series_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(mysql(&self.pool)?)
                    .await
                    .context("Failed to list test series")?;
                rows.iter().map(row_to_series_mysql).collect()
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) as count FROM test_series";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count test series")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count test series")?
                .get("count"),
        };
        Ok(count)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM test_series WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to delete test series")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to delete test series")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

fn decode_questions(raw: &str) -> Result<Vec<Question>> {
    serde_json::from_str(raw).context("Malformed questions document")
}

fn row_to_series_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<TestSeries> {
    let questions: String = row.get("questions");
    let duration: i64 = row.get("duration_minutes");
    Ok(TestSeries {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        duration_minutes: u32::try_from(duration).context("Invalid duration")?,
        marks_per_question: row.get("marks_per_question"),
        negative_marks: row.get("negative_marks"),
        questions: decode_questions(&questions)?,
        created_at: row.get("created_at"),
    })
}

fn row_to_series_mysql(row: &sqlx::mysql::MySqlRow) -> Result<TestSeries> {
    let questions: String = row.get("questions");
    let duration: i32 = row.get("duration_minutes");
    Ok(TestSeries {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        duration_minutes: u32::try_from(duration).context("Invalid duration")?,
        marks_per_question: row.get("marks_per_question"),
        negative_marks: row.get("negative_marks"),
        questions: decode_questions(&questions)?,
        created_at: row.get("created_at"),
    })
}
