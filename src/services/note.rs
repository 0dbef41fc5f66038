//! Study note service
//!
//! Notes are Markdown; the rendered HTML is stored next to the source and
//! refreshed whenever the content changes.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use super::audit::ChangeRecorder;
use super::error::{ServiceError, ServiceResult};
use super::markdown::MarkdownRenderer;
use super::validation::{self, order_clause, required};
use crate::db::repositories::{NoteRepository, VideoRepository};
use crate::models::{
    AuditAction, CreateNoteInput, ListParams, NewAuditLog, NoteFilter, PagedResult, StudyNote,
    UpdateNoteInput, NOTE_SORT_COLUMNS,
};

const ENTITY: &str = "note";

pub struct NoteService {
    repo: Arc<dyn NoteRepository>,
    videos: Arc<dyn VideoRepository>,
    renderer: MarkdownRenderer,
    recorder: ChangeRecorder,
}

impl NoteService {
    pub fn new(
        repo: Arc<dyn NoteRepository>,
        videos: Arc<dyn VideoRepository>,
        recorder: ChangeRecorder,
    ) -> Self {
        Self {
            repo,
            videos,
            renderer: MarkdownRenderer::new(),
            recorder,
        }
    }

    pub async fn create(&self, input: CreateNoteInput, actor: &str) -> ServiceResult<StudyNote> {
        let title = required("Title", &input.title)?;
        if let Some(video_id) = input.video_id {
            self.ensure_video_exists(video_id).await?;
        }

        let html = self.renderer.render(&input.content);
        let mut note = StudyNote::new(title, input.content, html);
        note.video_id = input.video_id;
        note.tags = validation::tags(input.tags);

        let created = self.repo.create(&note).await?;
        tracing::info!(note_id = created.id, video_id = ?created.video_id, "Note created");

        self.recorder
            .record(
                NewAuditLog::new(actor, AuditAction::Create, ENTITY, Some(created.id))
                    .with_details(json!({ "videoId": created.video_id })),
            )
            .await;
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<StudyNote> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Note", id))
    }

    pub async fn list(&self, filter: &NoteFilter, params: &ListParams) -> ServiceResult<PagedResult<StudyNote>> {
        let order_by = order_clause(params, &NOTE_SORT_COLUMNS)?;
        let total = self.repo.count(filter).await?;
        let items = self
            .repo
            .list(filter, &order_by, params.offset(), params.limit as i64)
            .await?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Apply the fields present in `input`; `videoId: null` detaches the note
    pub async fn update(&self, id: i64, input: UpdateNoteInput, actor: &str) -> ServiceResult<StudyNote> {
        let mut note = self.get(id).await?;

        if let Some(title) = input.title {
            note.title = required("Title", &title)?;
        }
        if let Some(content) = input.content {
            note.content_html = self.renderer.render(&content);
            note.content = content;
        }
        if let Some(video_id) = input.video_id {
            if let Some(video_id) = video_id {
                self.ensure_video_exists(video_id).await?;
            }
            note.video_id = video_id;
        }
        if let Some(tags) = input.tags {
            note.tags = validation::tags(tags);
        }

        note.updated_at = Utc::now();
        let updated = self.repo.update(&note).await?;

        self.recorder
            .record(NewAuditLog::new(actor, AuditAction::Update, ENTITY, Some(id)))
            .await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64, actor: &str) -> ServiceResult<()> {
        if !self.repo.delete(id).await? {
            return Err(ServiceError::not_found("Note", id));
        }
        self.recorder
            .record(NewAuditLog::new(actor, AuditAction::Delete, ENTITY, Some(id)))
            .await;
        Ok(())
    }

    async fn ensure_video_exists(&self, video_id: i64) -> ServiceResult<()> {
        if self.videos.get_by_id(video_id).await?.is_none() {
            return Err(ServiceError::validation(format!("Video {} does not exist", video_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Video;
    use crate::services::test_support::TestContext;

    async fn setup_test_service() -> (TestContext, NoteService) {
        let ctx = TestContext::new().await;
        let service = NoteService::new(ctx.note_repo(), ctx.video_repo(), ctx.recorder());
        (ctx, service)
    }

    async fn seed_video(ctx: &TestContext) -> Video {
        ctx.video_repo()
            .create(&Video::new("Intro".into(), "dQw4w9WgXcQ".into()))
            .await
            .unwrap()
    }

    fn input(title: &str, content: &str, video_id: Option<i64>) -> CreateNoteInput {
        CreateNoteInput {
            title: title.to_string(),
            content: content.to_string(),
            video_id,
            tags: vec!["week-1".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_renders_markdown() {
        let (ctx, service) = setup_test_service().await;
        let video = seed_video(&ctx).await;

        let note = service
            .create(input("Ownership", "# Moves\n\n**Copy** types", Some(video.id)), "admin")
            .await
            .unwrap();
        assert!(note.content_html.contains("<h1>Moves</h1>"));
        assert!(note.content_html.contains("<strong>Copy</strong>"));
        assert_eq!(note.video_id, Some(video.id));
    }

    #[tokio::test]
    async fn test_create_requires_existing_video() {
        let (_ctx, service) = setup_test_service().await;
        let result = service.create(input("Orphan", "text", Some(77)), "admin").await;
        assert!(matches!(result, Err(ServiceError::Validation(m)) if m.contains("77")));

        let blank = service.create(input("  ", "text", None), "admin").await;
        assert!(matches!(blank, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_rerenders_and_detaches() {
        let (ctx, service) = setup_test_service().await;
        let video = seed_video(&ctx).await;
        let note = service
            .create(input("Traits", "plain", Some(video.id)), "admin")
            .await
            .unwrap();

        let updated = service
            .update(
                note.id,
                UpdateNoteInput {
                    content: Some("*dyn* dispatch".to_string()),
                    video_id: Some(None),
                    ..Default::default()
                },
                "admin",
            )
            .await
            .unwrap();
        assert!(updated.content_html.contains("<em>dyn</em>"));
        assert_eq!(updated.video_id, None);
        assert_eq!(updated.title, "Traits");

        let bad = service
            .update(
                note.id,
                UpdateNoteInput {
                    video_id: Some(Some(999)),
                    ..Default::default()
                },
                "admin",
            )
            .await;
        assert!(matches!(bad, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_by_video_and_tag() {
        let (ctx, service) = setup_test_service().await;
        let video = seed_video(&ctx).await;
        service.create(input("A", "a", Some(video.id)), "admin").await.unwrap();
        let mut other = input("B", "b", None);
        other.tags = vec!["week-2".to_string()];
        service.create(other, "admin").await.unwrap();

        let by_video = NoteFilter {
            video_id: Some(video.id),
            ..Default::default()
        };
        let page = service.list(&by_video, &ListParams::new(1, 10)).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "A");

        let by_tag = NoteFilter {
            tag: Some("week-2".to_string()),
            ..Default::default()
        };
        let page = service.list(&by_tag, &ListParams::new(1, 10)).await.unwrap();
        assert_eq!(page.items[0].title, "B");
    }

    #[tokio::test]
    async fn test_delete() {
        let (_ctx, service) = setup_test_service().await;
        let note = service.create(input("Gone", "x", None), "admin").await.unwrap();
        service.delete(note.id, "admin").await.unwrap();
        assert!(matches!(service.get(note.id).await, Err(ServiceError::NotFound(_))));
    }
}
