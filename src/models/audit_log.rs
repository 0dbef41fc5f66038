//! Audit log model
//!
//! Append-only record of every mutation performed through the services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::pagination::{SortColumns, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Restore,
    Publish,
    Unpublish,
    Toggle,
    Purge,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::Restore => "restore",
            AuditAction::Publish => "publish",
            AuditAction::Unpublish => "unpublish",
            AuditAction::Toggle => "toggle",
            AuditAction::Purge => "purge",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for AuditAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(AuditAction::Create),
            "update" => Ok(AuditAction::Update),
            "delete" => Ok(AuditAction::Delete),
            "restore" => Ok(AuditAction::Restore),
            "publish" => Ok(AuditAction::Publish),
            "unpublish" => Ok(AuditAction::Unpublish),
            "toggle" => Ok(AuditAction::Toggle),
            "purge" => Ok(AuditAction::Purge),
            _ => Err(anyhow::anyhow!("Invalid audit action: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: i64,
    pub actor: String,
    pub action: AuditAction,
    /// Collection name, e.g. `video` or `user`
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Entry to append
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub actor: String,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub details: serde_json::Value,
}

impl NewAuditLog {
    pub fn new(actor: &str, action: AuditAction, entity_type: &str, entity_id: Option<i64>) -> Self {
        Self {
            actor: actor.to_string(),
            action,
            entity_type: entity_type.to_string(),
            entity_id,
            details: serde_json::json!({}),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub action: Option<String>,
    pub actor: Option<String>,
}

pub const AUDIT_SORT_COLUMNS: SortColumns = SortColumns {
    fields: &[
        ("id", "id"),
        ("actor", "actor"),
        ("action", "action"),
        ("entityType", "entity_type"),
        ("createdAt", "created_at"),
    ],
    default_column: "created_at",
    default_order: SortOrder::Desc,
};
