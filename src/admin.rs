//! Operator-facing admin surface.
//!
//! A small axum router the host application mounts behind its own
//! authentication: on-demand invalidation by tag or path, storage stats,
//! and a clear-all action.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::CacheError;
use crate::service::PageCache;

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub cache: Arc<PageCache>,
}

/// Build the admin router over a page cache instance.
pub fn admin_router(cache: Arc<PageCache>) -> Router {
    Router::new()
        .route("/cache/revalidate", post(revalidate))
        .route("/cache/stats", get(stats))
        .route("/cache/clear", post(clear))
        .with_state(AdminState { cache })
}

/// On-demand invalidation request; both lists are optional.
#[derive(Debug, Deserialize)]
pub struct RevalidateRequest {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub paths: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    pub invalidated: InvalidatedCounts,
}

#[derive(Debug, Serialize)]
pub struct InvalidatedCounts {
    pub tags: usize,
    pub paths: usize,
}

async fn revalidate(
    State(state): State<AdminState>,
    Json(request): Json<RevalidateRequest>,
) -> Response {
    let tags = match state.cache.invalidate_by_tags(&request.tags).await {
        Ok(count) => count,
        Err(err) => return internal_error("invalidate_by_tags", err),
    };
    let paths = match state.cache.invalidate_by_paths(&request.paths).await {
        Ok(count) => count,
        Err(err) => return internal_error("invalidate_by_paths", err),
    };

    // Zero matches is a success, not an error; the counts say so.
    Json(RevalidateResponse {
        revalidated: true,
        invalidated: InvalidatedCounts { tags, paths },
    })
    .into_response()
}

async fn stats(State(state): State<AdminState>) -> Response {
    match state.cache.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(err) => internal_error("stats", err),
    }
}

async fn clear(State(state): State<AdminState>) -> Response {
    match state.cache.clear().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => internal_error("clear", err),
    }
}

fn internal_error(op: &'static str, err: CacheError) -> Response {
    error!(op, error = %err, "admin cache operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
        .into_response()
}
