//! Request extractors
//!
//! Wrappers around axum's `Json`, `Query` and `Path` whose rejections use
//! the API error envelope, plus the audit actor and list parameters.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Query,
    },
    http::request::Parts,
};
use std::convert::Infallible;

use super::middleware::{ApiError, AppState};
use crate::models::{ListParams, PageQuery};

/// Header naming the user on whose behalf a mutation is made
pub const ACTOR_HEADER: &str = "x-actor";
pub const DEFAULT_ACTOR: &str = "system";
const MAX_ACTOR_LEN: usize = 100;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

/// Who performed a mutation, from `X-Actor` (defaults to `system`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

impl Actor {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_header(value: Option<&str>) -> Self {
        let name = value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| v.chars().take(MAX_ACTOR_LEN).collect())
            .unwrap_or_else(|| DEFAULT_ACTOR.to_string());
        Actor(name)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts.headers.get(ACTOR_HEADER).and_then(|v| v.to_str().ok());
        Ok(Actor::from_header(value))
    }
}

/// `?page=&limit=&sortBy=&order=` normalized against the pagination config
#[derive(Debug, Clone)]
pub struct Paging(pub ListParams);

impl FromRequestParts<AppState> for Paging {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<PageQuery>::from_request_parts(parts, state).await?;
        ListParams::from_query(&query, &state.pagination)
            .map(Paging)
            .map_err(ApiError::validation_error)
    }
}
