//! API middleware and shared state
//!
//! Contains:
//! - Application state shared by every handler
//! - The error type returned by handlers
//! - Request statistics feeding the dashboard

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::SharedCache;
use crate::config::{Config, PaginationConfig};
use crate::db::repositories::*;
use crate::db::DynDatabasePool;
use crate::models::RuntimeMetrics;
use crate::services::{
    AuditService, ChangeRecorder, DashboardService, DashboardSources, ModuleService, NoteService,
    PostService, PracticeService, ServiceError, UserService, VideoService,
};

// ============================================================================
// Request Statistics
// ============================================================================

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    /// Total number of requests processed
    total_requests: AtomicU64,
    /// Total response time in microseconds (for calculating average)
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a request with its response time
    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us.fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Average response time in microseconds
    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let total_time = self.total_response_time_us.load(Ordering::Relaxed);
        total_time as f64 / total as f64
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Point-in-time figures for the dashboard
    pub fn snapshot(&self) -> RuntimeMetrics {
        RuntimeMetrics {
            uptime_seconds: self.uptime_seconds(),
            total_requests: self.total_requests(),
            avg_response_time_ms: self.avg_response_time_us() / 1000.0,
        }
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Record request count and latency for every request
pub async fn request_stats_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state.request_stats.record(start.elapsed().as_micros() as u64);
    response
}

// ============================================================================
// Application State
// ============================================================================

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub module_service: Arc<ModuleService>,
    pub audit_service: Arc<AuditService>,
    pub video_service: Arc<VideoService>,
    pub note_service: Arc<NoteService>,
    pub post_service: Arc<PostService>,
    pub dashboard_service: Arc<DashboardService>,
    pub practice_service: Arc<PracticeService>,
    pub pagination: PaginationConfig,
    pub request_stats: Arc<RequestStats>,
}

impl AppState {
    /// Wire repositories and services over one pool and cache
    pub fn new(pool: DynDatabasePool, cache: SharedCache, config: &Config) -> Self {
        let users = SqlxUserRepository::boxed(pool.clone());
        let modules = SqlxModuleRepository::boxed(pool.clone());
        let audit_logs = SqlxAuditLogRepository::boxed(pool.clone());
        let videos = SqlxVideoRepository::boxed(pool.clone());
        let notes = SqlxNoteRepository::boxed(pool.clone());
        let posts = SqlxPostRepository::boxed(pool.clone());
        let series = SqlxTestSeriesRepository::boxed(pool.clone());

        let recorder = ChangeRecorder::new(audit_logs.clone(), cache.clone());
        let sources = DashboardSources {
            users: users.clone(),
            modules: modules.clone(),
            videos: videos.clone(),
            notes: notes.clone(),
            posts: posts.clone(),
            audit_logs: audit_logs.clone(),
        };

        Self {
            pool,
            user_service: Arc::new(UserService::new(users, recorder.clone())),
            module_service: Arc::new(ModuleService::new(modules, recorder.clone())),
            audit_service: Arc::new(AuditService::new(audit_logs, recorder.clone())),
            video_service: Arc::new(VideoService::new(videos.clone(), recorder.clone())),
            note_service: Arc::new(NoteService::new(notes, videos, recorder.clone())),
            post_service: Arc::new(PostService::new(posts, recorder.clone())),
            dashboard_service: Arc::new(DashboardService::new(
                sources,
                cache,
                Duration::from_secs(config.cache.ttl_seconds),
            )),
            practice_service: Arc::new(PracticeService::new(series, recorder)),
            pagination: config.pagination.clone(),
            request_stats: Arc::new(RequestStats::new()),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// Always `false`
    pub success: bool,
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        let mut err = Self::new(code, message);
        err.error.details = Some(details);
        err
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new("SERVICE_UNAVAILABLE", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT" => StatusCode::CONFLICT,
            "SERVICE_UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(m) => Self::not_found(m),
            ServiceError::Validation(m) => Self::validation_error(m),
            ServiceError::Conflict(m) => Self::conflict(m),
            ServiceError::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                Self::internal_error("Internal server error")
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
