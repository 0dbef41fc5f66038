//! Application module model (entries of the multi-application control dashboard)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pagination::{SortColumns, SortOrder};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppModule {
    pub id: i64,
    /// Stable lowercase identifier, unique
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    /// SPA route the dashboard links to
    pub route: String,
    pub icon: Option<String>,
    pub enabled: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppModule {
    pub fn new(key: String, name: String, route: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            key,
            name,
            description: None,
            route,
            icon: None,
            enabled: true,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateModuleInput {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub route: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateModuleInput {
    pub key: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub route: Option<String>,
    pub icon: Option<String>,
    pub enabled: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleFilter {
    pub enabled: Option<bool>,
}

pub const MODULE_SORT_COLUMNS: SortColumns = SortColumns {
    fields: &[
        ("id", "id"),
        ("key", "module_key"),
        ("name", "name"),
        ("sortOrder", "sort_order"),
        ("enabled", "enabled"),
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
    ],
    default_column: "sort_order",
    default_order: SortOrder::Asc,
};
