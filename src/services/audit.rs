//! Audit log service
//!
//! The audit trail is append-only. Entries are written by `ChangeRecorder`
//! after every successful mutation in the other services; only a purge of
//! entries older than a cutoff removes anything.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;

use super::dashboard::DASHBOARD_CACHE_PATTERN;
use super::error::{ServiceError, ServiceResult};
use super::validation::{order_clause, parse_enum};
use crate::cache::{CacheLayer, SharedCache};
use crate::db::repositories::AuditLogRepository;
use crate::models::{
    AuditAction, AuditFilter, AuditLog, ListParams, NewAuditLog, PagedResult, AUDIT_SORT_COLUMNS,
};

/// Records audit entries and drops cached dashboard stats after a mutation.
///
/// Neither step can fail the mutation that triggered it; failures are logged.
#[derive(Clone)]
pub struct ChangeRecorder {
    repo: Arc<dyn AuditLogRepository>,
    cache: SharedCache,
}

impl ChangeRecorder {
    pub fn new(repo: Arc<dyn AuditLogRepository>, cache: SharedCache) -> Self {
        Self { repo, cache }
    }

    pub async fn record(&self, entry: NewAuditLog) {
        if let Err(e) = self.repo.create(&entry).await {
            tracing::warn!(
                action = %entry.action,
                entity_type = %entry.entity_type,
                entity_id = ?entry.entity_id,
                "Failed to record audit entry: {:#}",
                e
            );
        }
        self.invalidate_dashboard().await;
    }

    pub async fn invalidate_dashboard(&self) {
        if let Err(e) = self.cache.delete_pattern(DASHBOARD_CACHE_PATTERN).await {
            tracing::warn!("Failed to invalidate dashboard cache: {:#}", e);
        }
    }
}

pub struct AuditService {
    repo: Arc<dyn AuditLogRepository>,
    recorder: ChangeRecorder,
}

impl AuditService {
    pub fn new(repo: Arc<dyn AuditLogRepository>, recorder: ChangeRecorder) -> Self {
        Self { repo, recorder }
    }

    /// Append an entry directly, surfacing storage errors to the caller
    pub async fn record(&self, entry: NewAuditLog) -> ServiceResult<AuditLog> {
        let entity_type = entry.entity_type.trim();
        if entity_type.is_empty() {
            return Err(ServiceError::validation("Entity type cannot be empty"));
        }
        let entry = NewAuditLog {
            entity_type: entity_type.to_string(),
            ..entry
        };
        let created = self.repo.create(&entry).await?;
        self.recorder.invalidate_dashboard().await;
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<AuditLog> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Audit log", id))
    }

    pub async fn list(&self, filter: &AuditFilter, params: &ListParams) -> ServiceResult<PagedResult<AuditLog>> {
        if let Some(action) = &filter.action {
            parse_enum::<AuditAction>("action", action)?;
        }
        let order_by = order_clause(params, &AUDIT_SORT_COLUMNS)?;
        let total = self.repo.count(filter).await?;
        let items = self
            .repo
            .list(filter, &order_by, params.offset(), params.limit as i64)
            .await?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Latest entries, newest first
    pub async fn recent(&self, limit: i64) -> ServiceResult<Vec<AuditLog>> {
        Ok(self
            .repo
            .list(&AuditFilter::default(), "created_at DESC, id DESC", 0, limit)
            .await?)
    }

    /// Delete entries created before `cutoff`.
    ///
    /// The purge itself is recorded afterwards, so it survives its own cutoff.
    pub async fn purge_before(&self, cutoff: DateTime<Utc>, actor: &str) -> ServiceResult<u64> {
        if cutoff > Utc::now() {
            return Err(ServiceError::validation("Purge cutoff cannot be in the future"));
        }
        let deleted = self.repo.delete_before(cutoff).await?;
        tracing::info!(deleted, cutoff = %cutoff, "Purged audit log entries");

        self.recorder
            .record(
                NewAuditLog::new(actor, AuditAction::Purge, "audit_log", None)
                    .with_details(json!({ "before": cutoff, "deleted": deleted })),
            )
            .await;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::TestContext;
    use chrono::Duration;

    async fn setup_test_service() -> (TestContext, AuditService) {
        let ctx = TestContext::new().await;
        let service = AuditService::new(ctx.audit_repo(), ctx.recorder());
        (ctx, service)
    }

    #[tokio::test]
    async fn test_record_and_get() {
        let (_ctx, service) = setup_test_service().await;
        let entry = service
            .record(NewAuditLog::new("alice", AuditAction::Update, " video ", Some(4)))
            .await
            .unwrap();
        assert_eq!(entry.entity_type, "video");

        let found = service.get(entry.id).await.unwrap();
        assert_eq!(found.actor, "alice");
        assert_eq!(found.action, AuditAction::Update);

        assert!(matches!(service.get(999).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_record_rejects_blank_entity_type() {
        let (_ctx, service) = setup_test_service().await;
        let result = service.record(NewAuditLog::new("a", AuditAction::Create, "  ", None)).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_filters_and_validates_action() {
        let (_ctx, service) = setup_test_service().await;
        for (actor, action, entity) in [
            ("a", AuditAction::Create, "video"),
            ("a", AuditAction::Delete, "video"),
            ("b", AuditAction::Create, "note"),
        ] {
            service.record(NewAuditLog::new(actor, action, entity, Some(1))).await.unwrap();
        }

        let filter = AuditFilter {
            action: Some("create".to_string()),
            ..Default::default()
        };
        let page = service.list(&filter, &ListParams::new(1, 10)).await.unwrap();
        assert_eq!(page.total, 2);

        let bad = AuditFilter {
            action: Some("explode".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.list(&bad, &ListParams::new(1, 10)).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let (_ctx, service) = setup_test_service().await;
        for id in 1..=3 {
            service.record(NewAuditLog::new("a", AuditAction::Create, "post", Some(id))).await.unwrap();
        }
        let recent = service.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].entity_id, Some(3));
        assert_eq!(recent[1].entity_id, Some(2));
    }

    #[tokio::test]
    async fn test_purge_before_records_itself() {
        let (_ctx, service) = setup_test_service().await;
        service.record(NewAuditLog::new("a", AuditAction::Create, "video", Some(1))).await.unwrap();
        service.record(NewAuditLog::new("a", AuditAction::Create, "video", Some(2))).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let deleted = service.purge_before(Utc::now(), "admin").await.unwrap();
        assert_eq!(deleted, 2);

        let remaining = service.list(&AuditFilter::default(), &ListParams::new(1, 10)).await.unwrap();
        assert_eq!(remaining.total, 1);
        assert_eq!(remaining.items[0].action, AuditAction::Purge);
        assert_eq!(remaining.items[0].actor, "admin");
    }

    #[tokio::test]
    async fn test_purge_rejects_future_cutoff() {
        let (_ctx, service) = setup_test_service().await;
        let result = service.purge_before(Utc::now() + Duration::days(1), "admin").await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }
}
