//! Blog post API endpoints
//!
//! - GET /api/posts - List posts (`status`, `tag`, `search`)
//! - POST /api/posts - Create post (slug generated from the title when absent)
//! - GET|PUT|PATCH|DELETE /api/posts/{id}
//! - GET /api/posts/slug/{slug} - Get post by slug
//! - POST /api/posts/{id}/publish, POST /api/posts/{id}/unpublish

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};

use super::extract::{Actor, ApiJson, ApiPath, ApiQuery, Paging};
use super::middleware::{ApiResult, AppState};
use super::responses::{ApiResponse, Deleted};
use crate::models::{CreatePostInput, PagedResult, Post, PostFilter, UpdatePostInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/slug/{slug}", get(get_post_by_slug))
        .route(
            "/{id}",
            get(get_post).put(update_post).patch(update_post).delete(delete_post),
        )
        .route("/{id}/publish", post(publish_post))
        .route("/{id}/unpublish", post(unpublish_post))
}

async fn list_posts(
    State(state): State<AppState>,
    Paging(params): Paging,
    ApiQuery(filter): ApiQuery<PostFilter>,
) -> ApiResult<ApiResponse<PagedResult<Post>>> {
    Ok(ApiResponse::ok(state.post_service.list(&filter, &params).await?))
}

async fn create_post(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<CreatePostInput>,
) -> ApiResult<ApiResponse<Post>> {
    let post = state.post_service.create(input, actor.as_str()).await?;
    Ok(ApiResponse::created(post))
}

async fn get_post(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ApiResponse<Post>> {
    Ok(ApiResponse::ok(state.post_service.get(id).await?))
}

async fn get_post_by_slug(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<ApiResponse<Post>> {
    Ok(ApiResponse::ok(state.post_service.get_by_slug(&slug).await?))
}

async fn update_post(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    actor: Actor,
    ApiJson(input): ApiJson<UpdatePostInput>,
) -> ApiResult<ApiResponse<Post>> {
    let post = state.post_service.update(id, input, actor.as_str()).await?;
    Ok(ApiResponse::ok(post))
}

async fn publish_post(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    actor: Actor,
) -> ApiResult<ApiResponse<Post>> {
    Ok(ApiResponse::ok(state.post_service.publish(id, actor.as_str()).await?))
}

async fn unpublish_post(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    actor: Actor,
) -> ApiResult<ApiResponse<Post>> {
    Ok(ApiResponse::ok(state.post_service.unpublish(id, actor.as_str()).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    actor: Actor,
) -> ApiResult<ApiResponse<Deleted>> {
    state.post_service.delete(id, actor.as_str()).await?;
    Ok(ApiResponse::ok(Deleted::new(id)))
}
