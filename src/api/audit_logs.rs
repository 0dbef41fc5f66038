//! Audit log API endpoints
//!
//! - GET /api/audit-logs - List entries (`entityType`, `entityId`, `action`, `actor`)
//! - DELETE /api/audit-logs?before=<rfc3339> - Purge entries older than a cutoff
//! - GET /api/audit-logs/{id} - Get one entry

use axum::{extract::State, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::extract::{Actor, ApiPath, ApiQuery, Paging};
use super::middleware::{ApiResult, AppState};
use super::responses::ApiResponse;
use crate::models::{AuditFilter, AuditLog, PagedResult};

#[derive(Debug, Deserialize)]
pub struct PurgeQuery {
    pub before: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResponse {
    pub purged: u64,
    pub before: DateTime<Utc>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_audit_logs).delete(purge_audit_logs))
        .route("/{id}", get(get_audit_log))
}

async fn list_audit_logs(
    State(state): State<AppState>,
    Paging(params): Paging,
    ApiQuery(filter): ApiQuery<AuditFilter>,
) -> ApiResult<ApiResponse<PagedResult<AuditLog>>> {
    Ok(ApiResponse::ok(state.audit_service.list(&filter, &params).await?))
}

async fn get_audit_log(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ApiResponse<AuditLog>> {
    Ok(ApiResponse::ok(state.audit_service.get(id).await?))
}

async fn purge_audit_logs(
    State(state): State<AppState>,
    actor: Actor,
    ApiQuery(query): ApiQuery<PurgeQuery>,
) -> ApiResult<ApiResponse<PurgeResponse>> {
    let purged = state
        .audit_service
        .purge_before(query.before, actor.as_str())
        .await?;
    Ok(ApiResponse::ok(PurgeResponse {
        purged,
        before: query.before,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::test_server;
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_mutations_are_audited() {
        let server = test_server().await;
        server
            .post("/api/modules")
            .json(&json!({ "key": "posts", "name": "Posts", "route": "/posts" }))
            .await;

        let response = server.get("/api/audit-logs?entityType=module&action=create").await;
        let body = response.json::<Value>();
        assert_eq!(body["data"]["total"], 1);
        let entry = body["data"]["items"][0].clone();
        assert_eq!(entry["actor"], "system");

        let id = entry["id"].as_i64().unwrap();
        let response = server.get(&format!("/api/audit-logs/{}", id)).await;
        assert_eq!(response.json::<Value>()["data"]["entityType"], "module");

        let response = server.get("/api/audit-logs?action=explode").await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_purge() {
        let server = test_server().await;
        server
            .post("/api/modules")
            .json(&json!({ "key": "posts", "name": "Posts", "route": "/posts" }))
            .await;

        let response = server.delete("/api/audit-logs?before=2000-01-01T00:00:00Z").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["data"]["purged"], 0);

        let response = server.delete("/api/audit-logs?before=2999-01-01T00:00:00Z").await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let response = server.delete("/api/audit-logs").await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }
}
