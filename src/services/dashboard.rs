//! Dashboard statistics
//!
//! Counts are gathered concurrently from the entity repositories and cached
//! under `dashboard:stats`. Every recorded mutation drops `dashboard:*`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::error::ServiceResult;
use crate::cache::{CacheLayer, SharedCache};
use crate::db::repositories::{
    AuditLogRepository, ModuleRepository, NoteRepository, PostRepository, UserRepository,
    VideoRepository,
};
use crate::models::{
    AuditFilter, AuditLog, DashboardStats, EntityCounts, ModuleFilter, NoteFilter, PostFilter,
    RuntimeMetrics, UserFilter, VideoFilter, RECENT_ACTIVITY_LIMIT,
};

pub const DASHBOARD_CACHE_KEY: &str = "dashboard:stats";
pub const DASHBOARD_CACHE_PATTERN: &str = "dashboard:*";

/// Database-derived part of the stats, the part worth caching
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Snapshot {
    counts: EntityCounts,
    recent_activity: Vec<AuditLog>,
    generated_at: DateTime<Utc>,
}

/// Repositories the dashboard reads from
#[derive(Clone)]
pub struct DashboardSources {
    pub users: Arc<dyn UserRepository>,
    pub modules: Arc<dyn ModuleRepository>,
    pub videos: Arc<dyn VideoRepository>,
    pub notes: Arc<dyn NoteRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub audit_logs: Arc<dyn AuditLogRepository>,
}

pub struct DashboardService {
    sources: DashboardSources,
    cache: SharedCache,
    cache_ttl: Duration,
}

impl DashboardService {
    pub fn new(sources: DashboardSources, cache: SharedCache, cache_ttl: Duration) -> Self {
        Self {
            sources,
            cache,
            cache_ttl,
        }
    }

    /// Current stats; counts come from the cache while it is warm
    pub async fn stats(&self, runtime: RuntimeMetrics) -> ServiceResult<DashboardStats> {
        let snapshot = match self.cache.get::<Snapshot>(DASHBOARD_CACHE_KEY).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => self.refresh().await?,
            Err(e) => {
                tracing::warn!("Discarding unreadable dashboard cache entry: {:#}", e);
                self.refresh().await?
            }
        };

        Ok(DashboardStats {
            counts: snapshot.counts,
            recent_activity: snapshot.recent_activity,
            uptime_seconds: runtime.uptime_seconds,
            total_requests: runtime.total_requests,
            avg_response_time_ms: runtime.avg_response_time_ms,
            generated_at: snapshot.generated_at,
        })
    }

    async fn refresh(&self) -> ServiceResult<Snapshot> {
        let s = &self.sources;
        let active_users = UserFilter {
            status: Some("active".to_string()),
            ..Default::default()
        };
        let enabled_modules = ModuleFilter { enabled: Some(true) };
        let published_videos = VideoFilter {
            published: Some(true),
            ..Default::default()
        };
        let published_posts = PostFilter {
            status: Some("published".to_string()),
            ..Default::default()
        };
        let all_users = UserFilter::default();
        let all_modules = ModuleFilter::default();
        let all_videos = VideoFilter::default();
        let all_notes = NoteFilter::default();
        let all_posts = PostFilter::default();
        let all_audit = AuditFilter::default();

        let (
            users,
            active_users,
            modules,
            enabled_modules,
            videos,
            published_videos,
            notes,
            posts,
            published_posts,
            audit_logs,
            recent_activity,
        ) = futures::try_join!(
            s.users.count(&all_users),
            s.users.count(&active_users),
            s.modules.count(&all_modules),
            s.modules.count(&enabled_modules),
            s.videos.count(&all_videos),
            s.videos.count(&published_videos),
            s.notes.count(&all_notes),
            s.posts.count(&all_posts),
            s.posts.count(&published_posts),
            s.audit_logs.count(&all_audit),
            s.audit_logs.list(
                &all_audit,
                "created_at DESC, id DESC",
                0,
                RECENT_ACTIVITY_LIMIT
            ),
        )?;

        let snapshot = Snapshot {
            counts: EntityCounts {
                users,
                active_users,
                modules,
                enabled_modules,
                videos,
                published_videos,
                notes,
                posts,
                published_posts,
                audit_logs,
            },
            recent_activity,
            generated_at: Utc::now(),
        };

        if let Err(e) = self.cache.set(DASHBOARD_CACHE_KEY, &snapshot, self.cache_ttl).await {
            tracing::warn!("Failed to cache dashboard stats: {:#}", e);
        }
        tracing::debug!(users, videos, notes, posts, "Dashboard stats refreshed");
        Ok(snapshot)
    }
}
