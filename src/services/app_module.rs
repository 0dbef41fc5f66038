//! Dashboard module service
//!
//! Modules are the tiles of the control dashboard. Each has a unique
//! lowercase slug key and can be switched on or off without being removed.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use super::audit::ChangeRecorder;
use super::error::{ServiceError, ServiceResult};
use super::slug::is_valid_slug;
use super::validation::{optional, order_clause, patch_optional, required};
use crate::db::repositories::ModuleRepository;
use crate::models::{
    AppModule, AuditAction, CreateModuleInput, ListParams, ModuleFilter, NewAuditLog, PagedResult,
    UpdateModuleInput, MODULE_SORT_COLUMNS,
};

const ENTITY: &str = "module";

pub struct ModuleService {
    repo: Arc<dyn ModuleRepository>,
    recorder: ChangeRecorder,
}

impl ModuleService {
    pub fn new(repo: Arc<dyn ModuleRepository>, recorder: ChangeRecorder) -> Self {
        Self { repo, recorder }
    }

    pub async fn create(&self, input: CreateModuleInput, actor: &str) -> ServiceResult<AppModule> {
        let key = validate_key(&input.key)?;
        let name = required("Name", &input.name)?;
        let route = required("Route", &input.route)?;
        self.ensure_key_available(&key, None).await?;

        let mut module = AppModule::new(key, name, route);
        module.description = optional(input.description);
        module.icon = optional(input.icon);
        module.enabled = input.enabled;
        module.sort_order = input.sort_order;

        let created = self.repo.create(&module).await?;
        tracing::info!(module_id = created.id, key = %created.key, "Module created");

        self.recorder
            .record(
                NewAuditLog::new(actor, AuditAction::Create, ENTITY, Some(created.id))
                    .with_details(json!({ "key": created.key })),
            )
            .await;
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<AppModule> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Module", id))
    }

    pub async fn list(&self, filter: &ModuleFilter, params: &ListParams) -> ServiceResult<PagedResult<AppModule>> {
        let order_by = order_clause(params, &MODULE_SORT_COLUMNS)?;
        let total = self.repo.count(filter).await?;
        let items = self
            .repo
            .list(filter, &order_by, params.offset(), params.limit as i64)
            .await?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn update(&self, id: i64, input: UpdateModuleInput, actor: &str) -> ServiceResult<AppModule> {
        let mut module = self.get(id).await?;

        if let Some(key) = input.key {
            let key = validate_key(&key)?;
            if key != module.key {
                self.ensure_key_available(&key, Some(id)).await?;
                module.key = key;
            }
        }
        if let Some(name) = input.name {
            module.name = required("Name", &name)?;
        }
        if let Some(route) = input.route {
            module.route = required("Route", &route)?;
        }
        patch_optional(&mut module.description, input.description);
        patch_optional(&mut module.icon, input.icon);
        if let Some(enabled) = input.enabled {
            module.enabled = enabled;
        }
        if let Some(sort_order) = input.sort_order {
            module.sort_order = sort_order;
        }

        module.updated_at = Utc::now();
        let updated = self.repo.update(&module).await?;

        self.recorder
            .record(NewAuditLog::new(actor, AuditAction::Update, ENTITY, Some(id)))
            .await;
        Ok(updated)
    }

    /// Flip `enabled`
    pub async fn toggle(&self, id: i64, actor: &str) -> ServiceResult<AppModule> {
        let mut module = self.get(id).await?;
        module.enabled = !module.enabled;
        module.updated_at = Utc::now();
        let updated = self.repo.update(&module).await?;
        tracing::info!(module_id = id, enabled = updated.enabled, "Module toggled");

        self.recorder
            .record(
                NewAuditLog::new(actor, AuditAction::Toggle, ENTITY, Some(id))
                    .with_details(json!({ "enabled": updated.enabled })),
            )
            .await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64, actor: &str) -> ServiceResult<()> {
        if !self.repo.delete(id).await? {
            return Err(ServiceError::not_found("Module", id));
        }
        self.recorder
            .record(NewAuditLog::new(actor, AuditAction::Delete, ENTITY, Some(id)))
            .await;
        Ok(())
    }

    async fn ensure_key_available(&self, key: &str, except: Option<i64>) -> ServiceResult<()> {
        match self.repo.get_by_key(key).await? {
            Some(existing) if Some(existing.id) != except => Err(ServiceError::conflict(format!(
                "Module key '{}' is already in use",
                key
            ))),
            _ => Ok(()),
        }
    }
}

fn validate_key(key: &str) -> ServiceResult<String> {
    let key = key.trim();
    if !is_valid_slug(key) {
        return Err(ServiceError::validation(format!(
            "Module key '{}' must be lowercase letters, digits and single hyphens",
            key
        )));
    }
    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::TestContext;

    async fn setup_test_service() -> (TestContext, ModuleService) {
        let ctx = TestContext::new().await;
        let service = ModuleService::new(ctx.module_repo(), ctx.recorder());
        (ctx, service)
    }

    fn input(key: &str, sort_order: i32) -> CreateModuleInput {
        CreateModuleInput {
            key: key.to_string(),
            name: format!("Module {}", key),
            description: Some("  ".to_string()),
            route: format!("/{}", key),
            icon: None,
            enabled: true,
            sort_order,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_ctx, service) = setup_test_service().await;
        let module = service.create(input("videos", 1), "admin").await.unwrap();
        assert_eq!(module.key, "videos");
        assert_eq!(module.description, None);

        let found = service.get(module.id).await.unwrap();
        assert_eq!(found.route, "/videos");
        assert!(matches!(service.get(404).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_and_duplicate_keys() {
        let (_ctx, service) = setup_test_service().await;
        for key in ["Videos", "two words", "", "trailing-"] {
            let result = service.create(input(key, 0), "admin").await;
            assert!(matches!(result, Err(ServiceError::Validation(_))), "key {:?}", key);
        }

        service.create(input("notes", 0), "admin").await.unwrap();
        let dup = service.create(input("notes", 1), "admin").await;
        assert!(matches!(dup, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_list_default_sort_and_filter() {
        let (_ctx, service) = setup_test_service().await;
        service.create(input("third", 3), "admin").await.unwrap();
        service.create(input("first", 1), "admin").await.unwrap();
        let second = service.create(input("second", 2), "admin").await.unwrap();
        service.toggle(second.id, "admin").await.unwrap();

        let page = service.list(&ModuleFilter::default(), &ListParams::new(1, 10)).await.unwrap();
        let keys: Vec<_> = page.items.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["first", "second", "third"]);

        let enabled = service
            .list(&ModuleFilter { enabled: Some(true) }, &ListParams::new(1, 10))
            .await
            .unwrap();
        assert_eq!(enabled.total, 2);
    }

    #[tokio::test]
    async fn test_update_and_toggle() {
        let (_ctx, service) = setup_test_service().await;
        let module = service.create(input("posts", 0), "admin").await.unwrap();
        service.create(input("notes", 0), "admin").await.unwrap();

        let updated = service
            .update(
                module.id,
                UpdateModuleInput {
                    name: Some("Blog".to_string()),
                    icon: Some("pen".to_string()),
                    ..Default::default()
                },
                "admin",
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Blog");
        assert_eq!(updated.icon.as_deref(), Some("pen"));
        assert_eq!(updated.key, "posts");

        let clash = service
            .update(
                module.id,
                UpdateModuleInput {
                    key: Some("notes".to_string()),
                    ..Default::default()
                },
                "admin",
            )
            .await;
        assert!(matches!(clash, Err(ServiceError::Conflict(_))));

        let toggled = service.toggle(module.id, "admin").await.unwrap();
        assert!(!toggled.enabled);
        let toggled = service.toggle(module.id, "admin").await.unwrap();
        assert!(toggled.enabled);
    }

    #[tokio::test]
    async fn test_delete() {
        let (_ctx, service) = setup_test_service().await;
        let module = service.create(input("temp", 0), "admin").await.unwrap();
        service.delete(module.id, "admin").await.unwrap();
        assert!(matches!(service.get(module.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.delete(module.id, "admin").await, Err(ServiceError::NotFound(_))));
    }
}
