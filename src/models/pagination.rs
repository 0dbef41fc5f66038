//! Pagination and sorting shared by every list endpoint

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::PaginationConfig;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(anyhow::anyhow!("Invalid sort order: {}", s)),
        }
    }
}

/// Raw pagination query string (`?page=&limit=&sortBy=&order=`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

/// Normalized list parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    /// 1-indexed page number
    pub page: u32,
    pub limit: u32,
    /// camelCase field name requested by the client
    pub sort_by: Option<String>,
    /// Explicit direction; the entity's default applies when absent
    pub order: Option<SortOrder>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            sort_by: None,
            order: None,
        }
    }
}

impl ListParams {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
            ..Self::default()
        }
    }

    pub fn sorted(mut self, sort_by: &str, order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.to_string());
        self.order = Some(order);
        self
    }

    /// Normalize a raw query: `page` floors at 1, `limit` is clamped to
    /// `1..=max_limit`, and an unknown `order` is rejected.
    pub fn from_query(query: &PageQuery, config: &PaginationConfig) -> Result<Self, String> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .unwrap_or(config.default_limit)
            .clamp(1, config.max_limit.max(1));

        let order = match query.order.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse().map_err(|e: anyhow::Error| e.to_string())?),
        };

        let sort_by = query
            .sort_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            page,
            limit,
            sort_by,
            order,
        })
    }

    /// Row offset of the first item on this page
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    /// Build an `ORDER BY` body from the whitelisted columns.
    ///
    /// `id` is always appended as a tiebreaker so pages are stable.
    pub fn order_clause(&self, columns: &SortColumns) -> Result<String, String> {
        let column = match self.sort_by.as_deref() {
            None => columns.default_column,
            Some(field) => columns.column_for(field).ok_or_else(|| {
                format!(
                    "Cannot sort by '{}'; allowed fields: {}",
                    field,
                    columns.field_names().join(", ")
                )
            })?,
        };
        let dir = self.order.unwrap_or(columns.default_order).as_sql();
        if column == "id" {
            Ok(format!("id {}", dir))
        } else {
            Ok(format!("{} {}, id {}", column, dir, dir))
        }
    }
}

/// Mapping of API sort fields to SQL columns for one entity
#[derive(Debug, Clone, Copy)]
pub struct SortColumns {
    /// (camelCase field, column)
    pub fields: &'static [(&'static str, &'static str)],
    pub default_column: &'static str,
    pub default_order: SortOrder,
}

impl SortColumns {
    pub fn column_for(&self, field: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|(name, column)| *name == field || *column == field)
            .map(|(_, column)| *column)
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(name, _)| *name).collect()
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            limit: params.limit,
            total_pages: total_pages(total, params.limit),
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }
}

/// `ceil(total / limit)`, zero when there is nothing to show
pub fn total_pages(total: i64, limit: u32) -> u32 {
    if total <= 0 || limit == 0 {
        return 0;
    }
    let limit = limit as i64;
    ((total + limit - 1) / limit) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: SortColumns = SortColumns {
        fields: &[("createdAt", "created_at"), ("title", "title"), ("id", "id")],
        default_column: "created_at",
        default_order: SortOrder::Desc,
    };

    fn config() -> PaginationConfig {
        PaginationConfig {
            default_limit: 10,
            max_limit: 100,
        }
    }

    #[test]
    fn test_from_query_defaults() {
        let params = ListParams::from_query(&PageQuery::default(), &config()).unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 10);
        assert_eq!(params.order, None);
        assert!(params.sort_by.is_none());
    }

    #[test]
    fn test_from_query_clamps() {
        let query = PageQuery {
            page: Some(0),
            limit: Some(1000),
            sort_by: Some("  ".to_string()),
            order: Some("ASC".to_string()),
        };
        let params = ListParams::from_query(&query, &config()).unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 100);
        assert_eq!(params.order, Some(SortOrder::Asc));
        assert!(params.sort_by.is_none());

        let query = PageQuery {
            limit: Some(0),
            ..PageQuery::default()
        };
        assert_eq!(ListParams::from_query(&query, &config()).unwrap().limit, 1);
    }

    #[test]
    fn test_from_query_rejects_unknown_order() {
        let query = PageQuery {
            order: Some("sideways".to_string()),
            ..PageQuery::default()
        };
        assert!(ListParams::from_query(&query, &config()).is_err());
    }

    #[test]
    fn test_order_clause() {
        let params = ListParams::default();
        assert_eq!(
            params.order_clause(&COLUMNS).unwrap(),
            "created_at DESC, id DESC"
        );

        let params = ListParams::default().sorted("title", SortOrder::Asc);
        assert_eq!(params.order_clause(&COLUMNS).unwrap(), "title ASC, id ASC");

        let params = ListParams::default().sorted("id", SortOrder::Asc);
        assert_eq!(params.order_clause(&COLUMNS).unwrap(), "id ASC");

        // snake_case column names are accepted too
        let params = ListParams::default().sorted("created_at", SortOrder::Asc);
        assert!(params.order_clause(&COLUMNS).is_ok());
    }

    #[test]
    fn test_order_clause_rejects_unknown_field() {
        let params = ListParams::default().sorted("password_hash; DROP TABLE users", SortOrder::Asc);
        let err = params.order_clause(&COLUMNS).unwrap_err();
        assert!(err.contains("allowed fields"));
    }

    #[test]
    fn test_offset() {
        assert_eq!(ListParams::new(1, 20).offset(), 0);
        assert_eq!(ListParams::new(3, 20).offset(), 40);
    }

    #[test]
    fn test_paged_result_serializes_camel_case() {
        let result = PagedResult::new(vec![1, 2], 12, &ListParams::new(1, 5));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["items"], serde_json::json!([1, 2]));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn total_pages_covers_every_item(total in 0i64..100_000, limit in 1u32..500) {
                let pages = total_pages(total, limit) as i64;
                prop_assert!(pages * limit as i64 >= total);
                if total > 0 {
                    prop_assert!((pages - 1) * (limit as i64) < total);
                } else {
                    prop_assert_eq!(pages, 0);
                }
            }

            #[test]
            fn normalized_limit_within_bounds(
                page in proptest::option::of(any::<u32>()),
                limit in proptest::option::of(any::<u32>()),
            ) {
                let query = PageQuery { page, limit, sort_by: None, order: None };
                let params = ListParams::from_query(&query, &config()).unwrap();
                prop_assert!(params.page >= 1);
                prop_assert!((1..=100).contains(&params.limit));
                prop_assert!(params.offset() >= 0);
            }
        }
    }
}
