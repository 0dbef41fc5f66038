//! Dashboard and health endpoints
//!
//! - GET /api/dashboard/stats - Entity counts, recent activity, runtime figures
//! - GET /api/health - Database ping

use axum::{extract::State, routing::get, Router};
use serde::Serialize;

use super::middleware::{ApiError, ApiResult, AppState};
use super::responses::ApiResponse;
use crate::models::DashboardStats;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(get_stats))
}

async fn get_stats(State(state): State<AppState>) -> ApiResult<ApiResponse<DashboardStats>> {
    let runtime = state.request_stats.snapshot();
    Ok(ApiResponse::ok(state.dashboard_service.stats(runtime).await?))
}

pub async fn health(State(state): State<AppState>) -> ApiResult<ApiResponse<HealthResponse>> {
    if let Err(e) = state.pool.ping().await {
        tracing::error!("Health check failed: {:#}", e);
        return Err(ApiError::unavailable("Database unreachable"));
    }
    Ok(ApiResponse::ok(HealthResponse {
        status: "ok",
        database: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}
