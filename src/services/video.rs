//! YouTube video service
//!
//! Accepts any common YouTube URL shape (or a bare ID) and stores the
//! canonical watch URL. Deleting a video detaches the notes taken for it.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use super::audit::ChangeRecorder;
use super::error::{ServiceError, ServiceResult};
use super::validation::{self, optional, order_clause, patch_optional, required};
use crate::db::repositories::VideoRepository;
use crate::models::{
    parse_youtube_id, watch_url, AuditAction, CreateVideoInput, ListParams, NewAuditLog,
    PagedResult, UpdateVideoInput, Video, VideoFilter, VIDEO_SORT_COLUMNS,
};

const ENTITY: &str = "video";

pub struct VideoService {
    repo: Arc<dyn VideoRepository>,
    recorder: ChangeRecorder,
}

impl VideoService {
    pub fn new(repo: Arc<dyn VideoRepository>, recorder: ChangeRecorder) -> Self {
        Self { repo, recorder }
    }

    pub async fn create(&self, input: CreateVideoInput, actor: &str) -> ServiceResult<Video> {
        let title = required("Title", &input.title)?;
        let youtube_id = youtube_id(&input.url)?;
        validate_duration(input.duration_seconds)?;
        self.ensure_unique(&youtube_id, None).await?;

        let mut video = Video::new(title, youtube_id);
        video.description = optional(input.description);
        video.channel = optional(input.channel);
        video.duration_seconds = input.duration_seconds;
        video.tags = validation::tags(input.tags);
        video.published = input.published;

        let created = self.repo.create(&video).await?;
        tracing::info!(video_id = created.id, youtube_id = %created.youtube_id, "Video created");

        self.recorder
            .record(
                NewAuditLog::new(actor, AuditAction::Create, ENTITY, Some(created.id))
                    .with_details(json!({ "youtubeId": created.youtube_id })),
            )
            .await;
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Video> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Video", id))
    }

    pub async fn list(&self, filter: &VideoFilter, params: &ListParams) -> ServiceResult<PagedResult<Video>> {
        let order_by = order_clause(params, &VIDEO_SORT_COLUMNS)?;
        let total = self.repo.count(filter).await?;
        let items = self
            .repo
            .list(filter, &order_by, params.offset(), params.limit as i64)
            .await?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn update(&self, id: i64, input: UpdateVideoInput, actor: &str) -> ServiceResult<Video> {
        let mut video = self.get(id).await?;

        if let Some(title) = input.title {
            video.title = required("Title", &title)?;
        }
        if let Some(url) = input.url {
            let youtube_id = youtube_id(&url)?;
            if youtube_id != video.youtube_id {
                self.ensure_unique(&youtube_id, Some(id)).await?;
                video.url = watch_url(&youtube_id);
                video.youtube_id = youtube_id;
            }
        }
        patch_optional(&mut video.description, input.description);
        patch_optional(&mut video.channel, input.channel);
        if input.duration_seconds.is_some() {
            validate_duration(input.duration_seconds)?;
            video.duration_seconds = input.duration_seconds;
        }
        if let Some(tags) = input.tags {
            video.tags = validation::tags(tags);
        }
        let published_changed = input.published.is_some_and(|p| p != video.published);
        if let Some(published) = input.published {
            video.published = published;
        }

        video.updated_at = Utc::now();
        let updated = self.repo.update(&video).await?;

        let action = match (published_changed, updated.published) {
            (true, true) => AuditAction::Publish,
            (true, false) => AuditAction::Unpublish,
            _ => AuditAction::Update,
        };
        self.recorder
            .record(NewAuditLog::new(actor, action, ENTITY, Some(id)))
            .await;
        Ok(updated)
    }

    /// Delete a video; its notes stay, with `videoId` cleared
    pub async fn delete(&self, id: i64, actor: &str) -> ServiceResult<u64> {
        let detached = self
            .repo
            .delete(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Video", id))?;
        tracing::info!(video_id = id, detached_notes = detached, "Video deleted");

        self.recorder
            .record(
                NewAuditLog::new(actor, AuditAction::Delete, ENTITY, Some(id))
                    .with_details(json!({ "detachedNotes": detached })),
            )
            .await;
        Ok(detached)
    }

    async fn ensure_unique(&self, youtube_id: &str, except: Option<i64>) -> ServiceResult<()> {
        match self.repo.get_by_youtube_id(youtube_id).await? {
            Some(existing) if Some(existing.id) != except => Err(ServiceError::conflict(format!(
                "Video '{}' is already in the library",
                youtube_id
            ))),
            _ => Ok(()),
        }
    }
}

fn youtube_id(url: &str) -> ServiceResult<String> {
    parse_youtube_id(url)
        .ok_or_else(|| ServiceError::validation(format!("Not a YouTube URL or video ID: {}", url.trim())))
}

fn validate_duration(duration: Option<i64>) -> ServiceResult<()> {
    match duration {
        Some(d) if d < 0 => Err(ServiceError::validation("Duration cannot be negative")),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuditFilter, StudyNote};
    use crate::services::test_support::TestContext;

    async fn setup_test_service() -> (TestContext, VideoService) {
        let ctx = TestContext::new().await;
        let service = VideoService::new(ctx.video_repo(), ctx.recorder());
        (ctx, service)
    }

    fn input(title: &str, url: &str) -> CreateVideoInput {
        CreateVideoInput {
            title: title.to_string(),
            url: url.to_string(),
            description: None,
            channel: Some("Channel".to_string()),
            duration_seconds: Some(212),
            tags: vec!["music".to_string(), " music ".to_string()],
            published: false,
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_url() {
        let (_ctx, service) = setup_test_service().await;
        let video = service
            .create(input("Intro", "https://youtu.be/dQw4w9WgXcQ?t=5"), "admin")
            .await
            .unwrap();
        assert_eq!(video.youtube_id, "dQw4w9WgXcQ");
        assert_eq!(video.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(video.tags, vec!["music".to_string()]);
    }

    #[tokio::test]
    async fn test_create_validation_and_conflict() {
        let (_ctx, service) = setup_test_service().await;
        let bad_url = service.create(input("Intro", "https://vimeo.com/123"), "admin").await;
        assert!(matches!(bad_url, Err(ServiceError::Validation(_))));

        let blank = service.create(input(" ", "dQw4w9WgXcQ"), "admin").await;
        assert!(matches!(blank, Err(ServiceError::Validation(_))));

        let mut negative = input("Intro", "dQw4w9WgXcQ");
        negative.duration_seconds = Some(-1);
        assert!(matches!(service.create(negative, "admin").await, Err(ServiceError::Validation(_))));

        service.create(input("Intro", "dQw4w9WgXcQ"), "admin").await.unwrap();
        let dup = service
            .create(input("Again", "https://www.youtube.com/watch?v=dQw4w9WgXcQ"), "admin")
            .await;
        assert!(matches!(dup, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_fields_and_publish_audit() {
        let (ctx, service) = setup_test_service().await;
        let video = service.create(input("Intro", "dQw4w9WgXcQ"), "admin").await.unwrap();

        let updated = service
            .update(
                video.id,
                UpdateVideoInput {
                    url: Some("https://www.youtube.com/embed/9bZkp7q19f0".to_string()),
                    channel: Some(String::new()),
                    published: Some(true),
                    ..Default::default()
                },
                "editor",
            )
            .await
            .unwrap();
        assert_eq!(updated.youtube_id, "9bZkp7q19f0");
        assert_eq!(updated.url, "https://www.youtube.com/watch?v=9bZkp7q19f0");
        assert_eq!(updated.channel, None);
        assert!(updated.published);
        assert_eq!(updated.title, "Intro");

        let filter = AuditFilter {
            action: Some("publish".to_string()),
            ..Default::default()
        };
        assert_eq!(ctx.audit_repo().count(&filter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (_ctx, service) = setup_test_service().await;
        let mut published = input("Published", "dQw4w9WgXcQ");
        published.published = true;
        published.tags = vec!["rust".to_string()];
        service.create(published, "admin").await.unwrap();
        service.create(input("Draft", "9bZkp7q19f0"), "admin").await.unwrap();

        let only_published = VideoFilter {
            published: Some(true),
            ..Default::default()
        };
        let page = service.list(&only_published, &ListParams::new(1, 10)).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Published");

        let tagged = VideoFilter {
            tag: Some("music".to_string()),
            ..Default::default()
        };
        let page = service.list(&tagged, &ListParams::new(1, 10)).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Draft");
    }

    #[tokio::test]
    async fn test_tag_and_search_filters_match_literally() {
        let (_ctx, service) = setup_test_service().await;
        let mut rust = input("Rust", "dQw4w9WgXcQ");
        rust.tags = vec!["rust".to_string()];
        service.create(rust, "admin").await.unwrap();
        let mut go = input("Go", "9bZkp7q19f0");
        go.tags = vec!["go".to_string()];
        service.create(go, "admin").await.unwrap();

        for tag in ["r_st", "%", "r%", "!"] {
            let filter = VideoFilter {
                tag: Some(tag.to_string()),
                ..Default::default()
            };
            let page = service.list(&filter, &ListParams::new(1, 10)).await.unwrap();
            assert_eq!(page.total, 0, "tag {:?} should match nothing", tag);
        }

        let search = VideoFilter {
            search: Some("_".to_string()),
            ..Default::default()
        };
        assert_eq!(service.list(&search, &ListParams::new(1, 10)).await.unwrap().total, 0);

        let exact = VideoFilter {
            tag: Some("rust".to_string()),
            ..Default::default()
        };
        let page = service.list(&exact, &ListParams::new(1, 10)).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Rust");
    }

    #[tokio::test]
    async fn test_delete_detaches_notes() {
        let (ctx, service) = setup_test_service().await;
        let video = service.create(input("Intro", "dQw4w9WgXcQ"), "admin").await.unwrap();

        let mut note = StudyNote::new("Notes".into(), "body".into(), "<p>body</p>".into());
        note.video_id = Some(video.id);
        let note = ctx.note_repo().create(&note).await.unwrap();

        assert_eq!(service.delete(video.id, "admin").await.unwrap(), 1);
        let note = ctx.note_repo().get_by_id(note.id).await.unwrap().unwrap();
        assert_eq!(note.video_id, None);

        assert!(matches!(service.delete(video.id, "admin").await, Err(ServiceError::NotFound(_))));
    }
}
