//! Study note API endpoints
//!
//! - GET /api/notes - List notes (`videoId`, `tag`, `search`)
//! - POST /api/notes - Create note (Markdown is rendered on save)
//! - GET|PUT|PATCH|DELETE /api/notes/{id}

use axum::{extract::State, routing::get, Router};

use super::extract::{Actor, ApiJson, ApiPath, ApiQuery, Paging};
use super::middleware::{ApiResult, AppState};
use super::responses::{ApiResponse, Deleted};
use crate::models::{CreateNoteInput, NoteFilter, PagedResult, StudyNote, UpdateNoteInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notes).post(create_note))
        .route(
            "/{id}",
            get(get_note).put(update_note).patch(update_note).delete(delete_note),
        )
}

async fn list_notes(
    State(state): State<AppState>,
    Paging(params): Paging,
    ApiQuery(filter): ApiQuery<NoteFilter>,
) -> ApiResult<ApiResponse<PagedResult<StudyNote>>> {
    Ok(ApiResponse::ok(state.note_service.list(&filter, &params).await?))
}

async fn create_note(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<CreateNoteInput>,
) -> ApiResult<ApiResponse<StudyNote>> {
    let note = state.note_service.create(input, actor.as_str()).await?;
    Ok(ApiResponse::created(note))
}

async fn get_note(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ApiResponse<StudyNote>> {
    Ok(ApiResponse::ok(state.note_service.get(id).await?))
}

async fn update_note(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    actor: Actor,
    ApiJson(input): ApiJson<UpdateNoteInput>,
) -> ApiResult<ApiResponse<StudyNote>> {
    let note = state.note_service.update(id, input, actor.as_str()).await?;
    Ok(ApiResponse::ok(note))
}

async fn delete_note(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    actor: Actor,
) -> ApiResult<ApiResponse<Deleted>> {
    state.note_service.delete(id, actor.as_str()).await?;
    Ok(ApiResponse::ok(Deleted::new(id)))
}
