//! API layer - HTTP handlers and routing
//!
//! Every endpoint lives under `/api` and answers with the
//! `{ success, data }` / `{ success, error }` envelope.

pub mod audit_logs;
pub mod dashboard;
pub mod extract;
pub mod middleware;
pub mod modules;
pub mod notes;
pub mod posts;
pub mod practice;
pub mod responses;
pub mod users;
pub mod videos;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use extract::{Actor, ACTOR_HEADER};
pub use middleware::{ApiError, ApiResult, AppState, RequestStats};
pub use responses::ApiResponse;

/// Build the `/api` routes
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(dashboard::health))
        .nest("/dashboard", dashboard::router())
        .nest("/users", users::router())
        .nest("/modules", modules::router())
        .nest("/audit-logs", audit_logs::router())
        .nest("/videos", videos::router())
        .nest("/notes", notes::router())
        .nest("/posts", posts::router())
        .nest("/practice", practice::router())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_allow_origin(cors_origin))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(ACTOR_HEADER)]);

    Router::new()
        .nest("/api", build_api_router())
        .fallback(|| async { ApiError::not_found("No such endpoint") })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Outermost, so every request is counted
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state)
}

/// `*` allows any origin; an unparsable origin allows none
fn cors_allow_origin(origin: &str) -> AllowOrigin {
    if origin.trim() == "*" {
        return AllowOrigin::any();
    }
    match origin.trim().parse::<HeaderValue>() {
        Ok(value) => AllowOrigin::exact(value),
        Err(e) => {
            tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    }
}
