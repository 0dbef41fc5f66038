//! Blog post service
//!
//! Posts start as drafts unless created as published. A slug supplied by
//! the client must be free; a slug derived from the title gets a numeric
//! suffix until it is.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use super::audit::ChangeRecorder;
use super::error::{ServiceError, ServiceResult};
use super::markdown::MarkdownRenderer;
use super::slug::{generate_slug, is_valid_slug};
use super::validation::{self, optional, order_clause, parse_enum, patch_optional, required};
use crate::db::repositories::PostRepository;
use crate::models::{
    AuditAction, CreatePostInput, ListParams, NewAuditLog, PagedResult, Post, PostFilter,
    PostStatus, UpdatePostInput, POST_SORT_COLUMNS,
};

const ENTITY: &str = "post";

/// Slug used when the title has no ASCII letters or digits
const FALLBACK_SLUG: &str = "post";

pub struct PostService {
    repo: Arc<dyn PostRepository>,
    renderer: MarkdownRenderer,
    recorder: ChangeRecorder,
}

impl PostService {
    pub fn new(repo: Arc<dyn PostRepository>, recorder: ChangeRecorder) -> Self {
        Self {
            repo,
            renderer: MarkdownRenderer::new(),
            recorder,
        }
    }

    pub async fn create(&self, input: CreatePostInput, actor: &str) -> ServiceResult<Post> {
        let title = required("Title", &input.title)?;
        let status: PostStatus = match input.status.as_deref() {
            Some(status) => parse_enum("status", status)?,
            None => PostStatus::Draft,
        };
        let slug = match optional(input.slug) {
            Some(slug) => {
                let slug = validate_slug(&slug)?;
                self.ensure_slug_available(&slug, None).await?;
                slug
            }
            None => self.unique_slug_for(&title).await?,
        };

        let html = self.renderer.render(&input.content);
        let mut post = Post::new(slug, title, input.content, html);
        post.excerpt = optional(input.excerpt);
        post.cover_image = optional(input.cover_image);
        post.tags = validation::tags(input.tags);
        if status == PostStatus::Published {
            post.publish(Utc::now());
        }

        let created = self.repo.create(&post).await?;
        tracing::info!(post_id = created.id, slug = %created.slug, "Post created");

        self.recorder
            .record(
                NewAuditLog::new(actor, AuditAction::Create, ENTITY, Some(created.id))
                    .with_details(json!({ "slug": created.slug, "status": created.status })),
            )
            .await;
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Post> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Post", id))
    }

    pub async fn get_by_slug(&self, slug: &str) -> ServiceResult<Post> {
        self.repo
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| ServiceError::not_found("Post", slug))
    }

    pub async fn list(&self, filter: &PostFilter, params: &ListParams) -> ServiceResult<PagedResult<Post>> {
        if let Some(status) = &filter.status {
            parse_enum::<PostStatus>("status", status)?;
        }
        let order_by = order_clause(params, &POST_SORT_COLUMNS)?;
        let total = self.repo.count(filter).await?;
        let items = self
            .repo
            .list(filter, &order_by, params.offset(), params.limit as i64)
            .await?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn update(&self, id: i64, input: UpdatePostInput, actor: &str) -> ServiceResult<Post> {
        let mut post = self.get(id).await?;

        if let Some(title) = input.title {
            post.title = required("Title", &title)?;
        }
        if let Some(slug) = optional(input.slug) {
            let slug = validate_slug(&slug)?;
            if slug != post.slug {
                self.ensure_slug_available(&slug, Some(id)).await?;
                post.slug = slug;
            }
        }
        if let Some(content) = input.content {
            post.content_html = self.renderer.render(&content);
            post.content = content;
        }
        patch_optional(&mut post.excerpt, input.excerpt);
        patch_optional(&mut post.cover_image, input.cover_image);
        if let Some(tags) = input.tags {
            post.tags = validation::tags(tags);
        }
        if let Some(status) = input.status {
            match parse_enum::<PostStatus>("status", &status)? {
                PostStatus::Published => post.publish(Utc::now()),
                PostStatus::Draft => post.status = PostStatus::Draft,
            }
        }

        post.updated_at = Utc::now();
        let updated = self.repo.update(&post).await?;

        self.recorder
            .record(NewAuditLog::new(actor, AuditAction::Update, ENTITY, Some(id)))
            .await;
        Ok(updated)
    }

    /// Publish; `publishedAt` keeps its first value on re-publish
    pub async fn publish(&self, id: i64, actor: &str) -> ServiceResult<Post> {
        let mut post = self.get(id).await?;
        if post.status == PostStatus::Published {
            return Ok(post);
        }
        post.publish(Utc::now());
        post.updated_at = Utc::now();
        let updated = self.repo.update(&post).await?;

        self.recorder
            .record(NewAuditLog::new(actor, AuditAction::Publish, ENTITY, Some(id)))
            .await;
        Ok(updated)
    }

    /// Back to draft
    pub async fn unpublish(&self, id: i64, actor: &str) -> ServiceResult<Post> {
        let mut post = self.get(id).await?;
        if post.status == PostStatus::Draft {
            return Ok(post);
        }
        post.status = PostStatus::Draft;
        post.updated_at = Utc::now();
        let updated = self.repo.update(&post).await?;

        self.recorder
            .record(NewAuditLog::new(actor, AuditAction::Unpublish, ENTITY, Some(id)))
            .await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64, actor: &str) -> ServiceResult<()> {
        if !self.repo.delete(id).await? {
            return Err(ServiceError::not_found("Post", id));
        }
        self.recorder
            .record(NewAuditLog::new(actor, AuditAction::Delete, ENTITY, Some(id)))
            .await;
        Ok(())
    }

    async fn ensure_slug_available(&self, slug: &str, except: Option<i64>) -> ServiceResult<()> {
        match self.repo.get_by_slug(slug).await? {
            Some(existing) if Some(existing.id) != except => Err(ServiceError::conflict(format!(
                "Slug '{}' is already in use",
                slug
            ))),
            _ => Ok(()),
        }
    }

    /// `title-slug`, then `title-slug-2`, `title-slug-3`, ...
    async fn unique_slug_for(&self, title: &str) -> ServiceResult<String> {
        let base = match generate_slug(title) {
            slug if slug.is_empty() => FALLBACK_SLUG.to_string(),
            slug => slug,
        };
        if !self.repo.exists_by_slug(&base).await? {
            return Ok(base);
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !self.repo.exists_by_slug(&candidate).await? {
                return Ok(candidate);
            }
            n += 1;
        }
    }
}

fn validate_slug(slug: &str) -> ServiceResult<String> {
    let slug = slug.trim().to_lowercase();
    if !is_valid_slug(&slug) {
        return Err(ServiceError::validation(format!(
            "Slug '{}' must be lowercase letters, digits and single hyphens",
            slug
        )));
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::TestContext;

    async fn setup_test_service() -> (TestContext, PostService) {
        let ctx = TestContext::new().await;
        let service = PostService::new(ctx.post_repo(), ctx.recorder());
        (ctx, service)
    }

    fn input(title: &str) -> CreatePostInput {
        CreatePostInput {
            title: title.to_string(),
            slug: None,
            excerpt: None,
            content: "Some **content**".to_string(),
            cover_image: None,
            status: None,
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_generates_unique_slugs() {
        let (_ctx, service) = setup_test_service().await;
        let first = service.create(input("Hello, World!"), "admin").await.unwrap();
        let second = service.create(input("Hello World"), "admin").await.unwrap();
        let third = service.create(input("hello world"), "admin").await.unwrap();

        assert_eq!(first.slug, "hello-world");
        assert_eq!(second.slug, "hello-world-2");
        assert_eq!(third.slug, "hello-world-3");
        assert_eq!(first.status, PostStatus::Draft);
        assert!(first.published_at.is_none());
        assert!(first.content_html.contains("<strong>content</strong>"));
    }

    #[tokio::test]
    async fn test_create_with_explicit_slug() {
        let (_ctx, service) = setup_test_service().await;
        let mut custom = input("Anything");
        custom.slug = Some("My-Slug".to_string());
        let post = service.create(custom, "admin").await.unwrap();
        assert_eq!(post.slug, "my-slug");

        let mut dup = input("Other");
        dup.slug = Some("my-slug".to_string());
        assert!(matches!(service.create(dup, "admin").await, Err(ServiceError::Conflict(_))));

        let mut bad = input("Other");
        bad.slug = Some("no spaces".to_string());
        assert!(matches!(service.create(bad, "admin").await, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_non_ascii_title_falls_back() {
        let (_ctx, service) = setup_test_service().await;
        let post = service.create(input("日本語"), "admin").await.unwrap();
        assert_eq!(post.slug, "post");
    }

    #[tokio::test]
    async fn test_publish_stamps_once() {
        let (_ctx, service) = setup_test_service().await;
        let post = service.create(input("Launch"), "admin").await.unwrap();

        let published = service.publish(post.id, "admin").await.unwrap();
        assert_eq!(published.status, PostStatus::Published);
        let first_stamp = published.published_at.expect("published_at set");

        let draft = service.unpublish(post.id, "admin").await.unwrap();
        assert_eq!(draft.status, PostStatus::Draft);
        assert_eq!(draft.published_at, Some(first_stamp));

        let again = service.publish(post.id, "admin").await.unwrap();
        assert_eq!(again.published_at, Some(first_stamp));
    }

    #[tokio::test]
    async fn test_create_published() {
        let (_ctx, service) = setup_test_service().await;
        let mut published = input("Live");
        published.status = Some("Published".to_string());
        let post = service.create(published, "admin").await.unwrap();
        assert_eq!(post.status, PostStatus::Published);
        assert!(post.published_at.is_some());

        let mut bad = input("Live");
        bad.status = Some("archived".to_string());
        assert!(matches!(service.create(bad, "admin").await, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_by_slug_and_update() {
        let (_ctx, service) = setup_test_service().await;
        let post = service.create(input("Original"), "admin").await.unwrap();

        let updated = service
            .update(
                post.id,
                UpdatePostInput {
                    slug: Some("renamed".to_string()),
                    excerpt: Some("Short".to_string()),
                    status: Some("published".to_string()),
                    ..Default::default()
                },
                "admin",
            )
            .await
            .unwrap();
        assert_eq!(updated.slug, "renamed");
        assert_eq!(updated.excerpt.as_deref(), Some("Short"));
        assert!(updated.published_at.is_some());

        assert_eq!(service.get_by_slug("renamed").await.unwrap().id, post.id);
        assert!(matches!(service.get_by_slug("original").await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let (_ctx, service) = setup_test_service().await;
        let a = service.create(input("A"), "admin").await.unwrap();
        service.create(input("B"), "admin").await.unwrap();
        service.publish(a.id, "admin").await.unwrap();

        let filter = PostFilter {
            status: Some("published".to_string()),
            ..Default::default()
        };
        let page = service.list(&filter, &ListParams::new(1, 10)).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, a.id);

        let bad = PostFilter {
            status: Some("deleted".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.list(&bad, &ListParams::new(1, 10)).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let (_ctx, service) = setup_test_service().await;
        let post = service.create(input("Bye"), "admin").await.unwrap();
        service.delete(post.id, "admin").await.unwrap();
        assert!(matches!(service.delete(post.id, "admin").await, Err(ServiceError::NotFound(_))));
    }
}
