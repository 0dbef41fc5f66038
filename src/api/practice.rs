//! Practice test API endpoints
//!
//! Test series:
//! - GET /api/practice/tests - List series (question bodies omitted)
//! - POST /api/practice/tests - Create series
//! - GET /api/practice/tests/{id} - Series with the answer key left out
//! - DELETE /api/practice/tests/{id}
//!
//! Sessions:
//! - POST /api/practice/sessions - Start a session for `seriesId`
//! - GET /api/practice/sessions/{id} - Current view, including the timer
//! - POST /api/practice/sessions/{id}/answer|clear|review|navigate|submit

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{Actor, ApiJson, ApiPath, Paging};
use super::middleware::{ApiResult, AppState};
use super::responses::{ApiResponse, Deleted};
use crate::models::{
    CreateTestSeriesInput, PagedResult, TestSeries, TestSeriesDetail, TestSeriesSummary,
};
use crate::practice::{Navigation, SessionView};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub series_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question: usize,
    pub option: usize,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: usize,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tests", get(list_series).post(create_series))
        .route("/tests/{id}", get(get_series).delete(delete_series))
        .route("/sessions", post(start_session))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/answer", post(answer))
        .route("/sessions/{id}/clear", post(clear_answer))
        .route("/sessions/{id}/review", post(toggle_review))
        .route("/sessions/{id}/navigate", post(navigate))
        .route("/sessions/{id}/submit", post(submit))
}

async fn list_series(
    State(state): State<AppState>,
    Paging(params): Paging,
) -> ApiResult<ApiResponse<PagedResult<TestSeriesSummary>>> {
    Ok(ApiResponse::ok(state.practice_service.list_series(&params).await?))
}

async fn create_series(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<CreateTestSeriesInput>,
) -> ApiResult<ApiResponse<TestSeries>> {
    let series = state.practice_service.create_series(input, actor.as_str()).await?;
    Ok(ApiResponse::created(series))
}

async fn get_series(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ApiResponse<TestSeriesDetail>> {
    let series = state.practice_service.get_series(id).await?;
    Ok(ApiResponse::ok(TestSeriesDetail::from(&series)))
}

async fn delete_series(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    actor: Actor,
) -> ApiResult<ApiResponse<Deleted>> {
    state.practice_service.delete_series(id, actor.as_str()).await?;
    Ok(ApiResponse::ok(Deleted::new(id)))
}

async fn start_session(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<StartSessionRequest>,
) -> ApiResult<ApiResponse<SessionView>> {
    let view = state.practice_service.start_session(body.series_id).await?;
    Ok(ApiResponse::created(view))
}

async fn get_session(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<SessionView>> {
    Ok(ApiResponse::ok(state.practice_service.get_session(id).await?))
}

async fn answer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AnswerRequest>,
) -> ApiResult<ApiResponse<SessionView>> {
    let view = state
        .practice_service
        .answer(id, body.question, body.option)
        .await?;
    Ok(ApiResponse::ok(view))
}

async fn clear_answer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<QuestionRequest>,
) -> ApiResult<ApiResponse<SessionView>> {
    Ok(ApiResponse::ok(state.practice_service.clear(id, body.question).await?))
}

async fn toggle_review(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<QuestionRequest>,
) -> ApiResult<ApiResponse<SessionView>> {
    Ok(ApiResponse::ok(state.practice_service.review(id, body.question).await?))
}

async fn navigate(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(navigation): ApiJson<Navigation>,
) -> ApiResult<ApiResponse<SessionView>> {
    Ok(ApiResponse::ok(state.practice_service.navigate(id, navigation).await?))
}

async fn submit(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<SessionView>> {
    Ok(ApiResponse::ok(state.practice_service.submit(id).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::test_server;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    async fn create_series(server: &TestServer) -> i64 {
        let response = server
            .post("/api/practice/tests")
            .json(&json!({
                "title": "Ownership quiz",
                "durationMinutes": 15,
                "marksPerQuestion": 2.0,
                "negativeMarks": 0.5,
                "questions": [
                    { "prompt": "Is String Copy?", "options": ["yes", "no"], "correctOption": 1 },
                    { "prompt": "Is i32 Copy?", "options": ["yes", "no"], "correctOption": 0 }
                ]
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        response.json::<Value>()["data"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_practice_session_flow() {
        let server = test_server().await;
        let series_id = create_series(&server).await;

        let response = server.get("/api/practice/tests").await;
        let listed = response.json::<Value>()["data"]["items"][0].clone();
        assert_eq!(listed["questionCount"], 2);
        assert!(listed.get("questions").is_none());

        let response = server.get(&format!("/api/practice/tests/{}", series_id)).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let detail = response.json::<Value>()["data"].clone();
        assert_eq!(detail["questions"][1]["prompt"], "Is i32 Copy?");
        assert_eq!(detail["questions"][1]["options"], json!(["yes", "no"]));
        assert!(detail["questions"][0].get("correctOption").is_none());
        assert!(detail["questions"][1].get("correctOption").is_none());

        let response = server
            .post("/api/practice/sessions")
            .json(&json!({ "seriesId": series_id }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let view = response.json::<Value>()["data"].clone();
        assert!(view["questions"][0].get("correctOption").is_none());
        assert_eq!(view["questions"][0]["status"], "notAnswered");
        let session = view["id"].as_str().unwrap().to_string();

        server
            .post(&format!("/api/practice/sessions/{}/answer", session))
            .json(&json!({ "question": 0, "option": 1 }))
            .await;
        let view = server
            .post(&format!("/api/practice/sessions/{}/navigate", session))
            .json(&json!({ "direction": "next" }))
            .await
            .json::<Value>()["data"]
            .clone();
        assert_eq!(view["current"], 1);

        let view = server
            .post(&format!("/api/practice/sessions/{}/review", session))
            .json(&json!({ "question": 1 }))
            .await
            .json::<Value>()["data"]
            .clone();
        assert_eq!(view["questions"][1]["status"], "markedForReview");

        let view = server
            .post(&format!("/api/practice/sessions/{}/submit", session))
            .await
            .json::<Value>()["data"]
            .clone();
        assert_eq!(view["submitted"], true);
        assert_eq!(view["report"]["correct"], 1);
        assert_eq!(view["report"]["unanswered"], 1);
        assert_eq!(view["report"]["score"], 2.0);

        let response = server
            .post(&format!("/api/practice/sessions/{}/answer", session))
            .json(&json!({ "question": 1, "option": 0 }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);

        let response = server.get(&format!("/api/practice/sessions/{}", session)).await;
        assert_eq!(response.json::<Value>()["data"]["submitted"], true);
    }

    #[tokio::test]
    async fn test_practice_errors() {
        let server = test_server().await;
        let series_id = create_series(&server).await;

        let response = server
            .post("/api/practice/sessions")
            .json(&json!({ "seriesId": 999 }))
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

        let response = server.get("/api/practice/sessions/not-a-uuid").await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let session = server
            .post("/api/practice/sessions")
            .json(&json!({ "seriesId": series_id }))
            .await
            .json::<Value>()["data"]["id"]
            .as_str()
            .unwrap()
            .to_string();
        let response = server
            .post(&format!("/api/practice/sessions/{}/navigate", session))
            .json(&json!({ "index": 7 }))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let response = server
            .post("/api/practice/tests")
            .json(&json!({ "title": "Empty", "durationMinutes": 10, "questions": [] }))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let response = server.delete(&format!("/api/practice/tests/{}", series_id)).await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }
}
