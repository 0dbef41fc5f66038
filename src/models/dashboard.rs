//! Dashboard statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit_log::AuditLog;

/// Row counts gathered from the database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityCounts {
    pub users: i64,
    pub active_users: i64,
    pub modules: i64,
    pub enabled_modules: i64,
    pub videos: i64,
    pub published_videos: i64,
    pub notes: i64,
    pub posts: i64,
    pub published_posts: i64,
    pub audit_logs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(flatten)]
    pub counts: EntityCounts,
    /// Latest audit entries, newest first
    pub recent_activity: Vec<AuditLog>,
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub avg_response_time_ms: f64,
    pub generated_at: DateTime<Utc>,
}

/// Number of audit entries shown on the dashboard
pub const RECENT_ACTIVITY_LIMIT: i64 = 5;

/// Process-level counters supplied by the HTTP layer
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RuntimeMetrics {
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub avg_response_time_ms: f64,
}
