//! Dashboard module API endpoints
//!
//! - GET /api/modules - List modules (`enabled`)
//! - POST /api/modules - Create module
//! - GET|PUT|PATCH|DELETE /api/modules/{id}
//! - POST /api/modules/{id}/toggle - Flip the enabled flag

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};

use super::extract::{Actor, ApiJson, ApiPath, ApiQuery, Paging};
use super::middleware::{ApiResult, AppState};
use super::responses::{ApiResponse, Deleted};
use crate::models::{AppModule, CreateModuleInput, ModuleFilter, PagedResult, UpdateModuleInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_modules).post(create_module))
        .route(
            "/{id}",
            get(get_module).put(update_module).patch(update_module).delete(delete_module),
        )
        .route("/{id}/toggle", post(toggle_module))
}

async fn list_modules(
    State(state): State<AppState>,
    Paging(params): Paging,
    ApiQuery(filter): ApiQuery<ModuleFilter>,
) -> ApiResult<ApiResponse<PagedResult<AppModule>>> {
    Ok(ApiResponse::ok(state.module_service.list(&filter, &params).await?))
}

async fn create_module(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<CreateModuleInput>,
) -> ApiResult<ApiResponse<AppModule>> {
    let module = state.module_service.create(input, actor.as_str()).await?;
    Ok(ApiResponse::created(module))
}

async fn get_module(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ApiResponse<AppModule>> {
    Ok(ApiResponse::ok(state.module_service.get(id).await?))
}

async fn update_module(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    actor: Actor,
    ApiJson(input): ApiJson<UpdateModuleInput>,
) -> ApiResult<ApiResponse<AppModule>> {
    let module = state.module_service.update(id, input, actor.as_str()).await?;
    Ok(ApiResponse::ok(module))
}

async fn toggle_module(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    actor: Actor,
) -> ApiResult<ApiResponse<AppModule>> {
    let module = state.module_service.toggle(id, actor.as_str()).await?;
    Ok(ApiResponse::ok(module))
}

async fn delete_module(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    actor: Actor,
) -> ApiResult<ApiResponse<Deleted>> {
    state.module_service.delete(id, actor.as_str()).await?;
    Ok(ApiResponse::ok(Deleted::new(id)))
}
