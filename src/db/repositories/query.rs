//! Dynamic WHERE clauses for list and count queries
//!
//! Filters are built once per request and bound to either driver.
//! Column names always come from code, values are always bound.

use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, Sqlite};

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Bool(bool),
    Text(String),
    Time(DateTime<Utc>),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Time(v)
    }
}

/// Escape character for `LIKE` patterns, spelled the same on both drivers
const LIKE_ESCAPE: char = '!';

/// Make `%`, `_` and the escape character match literally
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Conjunction of conditions
#[derive(Debug, Default, Clone)]
pub struct Filters {
    clauses: Vec<String>,
    values: Vec<SqlValue>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(&mut self, column: &str, value: impl Into<SqlValue>) -> &mut Self {
        self.clauses.push(format!("{} = ?", column));
        self.values.push(value.into());
        self
    }

    pub fn before(&mut self, column: &str, at: DateTime<Utc>) -> &mut Self {
        self.clauses.push(format!("{} < ?", column));
        self.values.push(SqlValue::Time(at));
        self
    }

    /// A condition without bound values, e.g. `deleted_at IS NULL`
    pub fn raw(&mut self, clause: &str) -> &mut Self {
        self.clauses.push(clause.to_string());
        self
    }

    /// Substring match on any of `columns`
    pub fn search(&mut self, columns: &[&str], term: &str) -> &mut Self {
        let term = term.trim();
        if term.is_empty() || columns.is_empty() {
            return self;
        }
        let pattern = format!("%{}%", escape_like(term));
        let parts: Vec<String> = columns
            .iter()
            .map(|c| format!("{} LIKE ? ESCAPE '{}'", c, LIKE_ESCAPE))
            .collect();
        self.clauses.push(format!("({})", parts.join(" OR ")));
        for _ in columns {
            self.values.push(SqlValue::Text(pattern.clone()));
        }
        self
    }

    /// Membership test on a JSON array column of strings
    pub fn has_tag(&mut self, column: &str, tag: &str) -> &mut Self {
        let quoted = serde_json::Value::String(tag.trim().to_string()).to_string();
        self.clauses.push(format!("{} LIKE ? ESCAPE '{}'", column, LIKE_ESCAPE));
        self.values.push(SqlValue::Text(format!("%{}%", escape_like(&quoted))));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// `" WHERE a = ? AND b = ?"`, or an empty string
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }
}

pub fn bind_sqlite<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: &[SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value.clone() {
            SqlValue::Int(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Time(v) => query.bind(v),
        };
    }
    query
}

pub fn bind_mysql<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    values: &[SqlValue],
) -> Query<'q, MySql, MySqlArguments> {
    for value in values {
        query = match value.clone() {
            SqlValue::Int(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Time(v) => query.bind(v),
        };
    }
    query
}

/// Encode a tag list for a JSON TEXT column
pub fn tags_to_json(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a JSON TEXT tag column; malformed content reads as empty
pub fn tags_from_json(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filters() {
        let filters = Filters::new();
        assert!(filters.is_empty());
        assert_eq!(filters.where_sql(), "");
        assert!(filters.values().is_empty());
    }

    #[test]
    fn test_filters_join_with_and() {
        let mut filters = Filters::new();
        filters
            .eq("status", "published")
            .raw("deleted_at IS NULL")
            .search(&["title", "content"], "rust");

        assert_eq!(
            filters.where_sql(),
            " WHERE status = ? AND deleted_at IS NULL AND (title LIKE ? ESCAPE '!' OR content LIKE ? ESCAPE '!')"
        );
        assert_eq!(
            filters.values(),
            &[
                SqlValue::Text("published".into()),
                SqlValue::Text("%rust%".into()),
                SqlValue::Text("%rust%".into()),
            ]
        );
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let mut filters = Filters::new();
        filters.search(&["title"], "   ");
        assert!(filters.is_empty());
    }

    #[test]
    fn test_has_tag_matches_quoted_element() {
        let mut filters = Filters::new();
        filters.has_tag("tags", "rust");
        assert_eq!(filters.values(), &[SqlValue::Text("%\"rust\"%".into())]);
        assert_eq!(filters.where_sql(), " WHERE tags LIKE ? ESCAPE '!'");
    }

    #[test]
    fn test_like_wildcards_are_escaped() {
        assert_eq!(escape_like("r_st"), "r!_st");
        assert_eq!(escape_like("100%!"), "100!%!!");

        let mut filters = Filters::new();
        filters.has_tag("tags", "%").search(&["title"], "a_b");
        assert_eq!(
            filters.values(),
            &[SqlValue::Text("%\"!%\"%".into()), SqlValue::Text("%a!_b%".into())]
        );
    }

    #[test]
    fn test_tags_json() {
        let tags = vec!["a".to_string(), "b c".to_string()];
        assert_eq!(tags_from_json(&tags_to_json(&tags)), tags);
        assert!(tags_from_json("not json").is_empty());
    }
}
