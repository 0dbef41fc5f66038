//! Video API endpoints
//!
//! - GET /api/videos - List videos (`published`, `tag`, `search`)
//! - POST /api/videos - Add a YouTube video by URL or ID
//! - GET|PUT|PATCH|DELETE /api/videos/{id}

use axum::{extract::State, routing::get, Router};

use super::extract::{Actor, ApiJson, ApiPath, ApiQuery, Paging};
use super::middleware::{ApiResult, AppState};
use super::responses::{ApiResponse, Deleted};
use crate::models::{CreateVideoInput, PagedResult, UpdateVideoInput, Video, VideoFilter};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_videos).post(create_video))
        .route(
            "/{id}",
            get(get_video).put(update_video).patch(update_video).delete(delete_video),
        )
}

async fn list_videos(
    State(state): State<AppState>,
    Paging(params): Paging,
    ApiQuery(filter): ApiQuery<VideoFilter>,
) -> ApiResult<ApiResponse<PagedResult<Video>>> {
    Ok(ApiResponse::ok(state.video_service.list(&filter, &params).await?))
}

async fn create_video(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<CreateVideoInput>,
) -> ApiResult<ApiResponse<Video>> {
    let video = state.video_service.create(input, actor.as_str()).await?;
    Ok(ApiResponse::created(video))
}

async fn get_video(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ApiResponse<Video>> {
    Ok(ApiResponse::ok(state.video_service.get(id).await?))
}

async fn update_video(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    actor: Actor,
    ApiJson(input): ApiJson<UpdateVideoInput>,
) -> ApiResult<ApiResponse<Video>> {
    let video = state.video_service.update(id, input, actor.as_str()).await?;
    Ok(ApiResponse::ok(video))
}

async fn delete_video(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    actor: Actor,
) -> ApiResult<ApiResponse<Deleted>> {
    let detached = state.video_service.delete(id, actor.as_str()).await?;
    Ok(ApiResponse::ok(Deleted {
        detached_notes: Some(detached),
        ..Deleted::new(id)
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::test_server;
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_video_lifecycle_detaches_notes() {
        let server = test_server().await;

        let response = server
            .post("/api/videos")
            .json(&json!({ "title": "Lifetimes", "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let video = response.json::<Value>()["data"].clone();
        assert_eq!(video["youtubeId"], "dQw4w9WgXcQ");
        let id = video["id"].as_i64().unwrap();

        let note = server
            .post("/api/notes")
            .json(&json!({ "title": "Notes", "content": "x", "videoId": id }))
            .await
            .json::<Value>()["data"]
            .clone();

        let response = server.delete(&format!("/api/videos/{}", id)).await;
        assert_eq!(
            response.json::<Value>()["data"],
            json!({ "deleted": true, "id": id, "detachedNotes": 1 })
        );

        let note = server
            .get(&format!("/api/notes/{}", note["id"].as_i64().unwrap()))
            .await
            .json::<Value>();
        assert_eq!(note["data"]["videoId"], Value::Null);
    }

    #[tokio::test]
    async fn test_video_rejects_foreign_url_and_duplicates() {
        let server = test_server().await;
        let response = server
            .post("/api/videos")
            .json(&json!({ "title": "Elsewhere", "url": "https://vimeo.com/1234" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        server
            .post("/api/videos")
            .json(&json!({ "title": "One", "url": "dQw4w9WgXcQ" }))
            .await;
        let response = server
            .post("/api/videos")
            .json(&json!({ "title": "Two", "url": "https://youtu.be/dQw4w9WgXcQ" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);
    }
}
