//! User API endpoints
//!
//! - GET /api/users - List users (`role`, `status`, `search`, `includeDeleted`)
//! - POST /api/users - Create user
//! - GET /api/users/{id} - Get user
//! - PUT|PATCH /api/users/{id} - Update user
//! - DELETE /api/users/{id} - Soft delete user
//! - POST /api/users/{id}/restore - Restore a deleted user

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};

use super::extract::{Actor, ApiJson, ApiPath, ApiQuery, Paging};
use super::middleware::{ApiResult, AppState};
use super::responses::{ApiResponse, Deleted};
use crate::models::{CreateUserInput, PagedResult, UpdateUserInput, User, UserFilter};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/{id}",
            get(get_user).put(update_user).patch(update_user).delete(delete_user),
        )
        .route("/{id}/restore", post(restore_user))
}

async fn list_users(
    State(state): State<AppState>,
    Paging(params): Paging,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> ApiResult<ApiResponse<PagedResult<User>>> {
    let page = state.user_service.list(&filter, &params).await?;
    Ok(ApiResponse::ok(page))
}

async fn create_user(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<CreateUserInput>,
) -> ApiResult<ApiResponse<User>> {
    let user = state.user_service.create(input, actor.as_str()).await?;
    Ok(ApiResponse::created(user))
}

async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ApiResponse<User>> {
    Ok(ApiResponse::ok(state.user_service.get(id).await?))
}

async fn update_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    actor: Actor,
    ApiJson(input): ApiJson<UpdateUserInput>,
) -> ApiResult<ApiResponse<User>> {
    let user = state.user_service.update(id, input, actor.as_str()).await?;
    Ok(ApiResponse::ok(user))
}

async fn delete_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    actor: Actor,
) -> ApiResult<ApiResponse<Deleted>> {
    state.user_service.delete(id, actor.as_str()).await?;
    Ok(ApiResponse::ok(Deleted::new(id)))
}

async fn restore_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    actor: Actor,
) -> ApiResult<ApiResponse<User>> {
    let user = state.user_service.restore(id, actor.as_str()).await?;
    Ok(ApiResponse::ok(user))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{test_server, ACTOR};
    use axum::http::HeaderValue;
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_user_crud_flow() {
        let server = test_server().await;

        let response = server
            .post("/api/users")
            .json(&json!({ "name": "Alice", "email": "Alice@Example.com", "password": "hunter2hunter2" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let body = response.json::<Value>();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["email"], "alice@example.com");
        assert!(body["data"].get("passwordHash").is_none());
        let id = body["data"]["id"].as_i64().unwrap();

        let response = server
            .patch(&format!("/api/users/{}", id))
            .json(&json!({ "role": "admin" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["data"]["role"], "admin");

        let response = server.delete(&format!("/api/users/{}", id)).await;
        assert_eq!(response.json::<Value>()["data"], json!({ "deleted": true, "id": id }));

        let response = server.get(&format!("/api/users/{}", id)).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["error"]["code"], "NOT_FOUND");

        let response = server.post(&format!("/api/users/{}/restore", id)).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let response = server.post(&format!("/api/users/{}/restore", id)).await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_user_validation_errors() {
        let server = test_server().await;

        let response = server
            .post("/api/users")
            .json(&json!({ "name": "Bob", "email": "not-an-email", "password": "hunter2hunter2" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body = response.json::<Value>();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        // Malformed body and path use the same envelope
        let response = server.post("/api/users").json(&json!({ "name": "Bob" })).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"]["code"], "VALIDATION_ERROR");

        let response = server.get("/api/users/abc").await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let response = server.get("/api/users?sortBy=password").await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_user_list_pagination_and_actor() {
        let server = test_server().await;
        for i in 0..3 {
            server
                .post("/api/users")
                .add_header(ACTOR, HeaderValue::from_static("alice"))
                .json(&json!({ "name": format!("User {}", i), "email": format!("u{}@example.com", i), "password": "password123" }))
                .await;
        }

        let response = server.get("/api/users?page=2&limit=2&sortBy=name&order=asc").await;
        let body = response.json::<Value>();
        assert_eq!(body["data"]["total"], 3);
        assert_eq!(body["data"]["totalPages"], 2);
        assert_eq!(body["data"]["items"][0]["name"], "User 2");

        let response = server.get("/api/audit-logs?actor=alice&entityType=user").await;
        assert_eq!(response.json::<Value>()["data"]["total"], 3);
    }
}
