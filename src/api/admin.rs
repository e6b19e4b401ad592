//! Admin API endpoints
//!
//! Mounted behind `require_auth` + `require_admin`:
//! - user listing and removal
//! - response cache purge

use axum::{
    body::Bytes,
    extract::State,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::api::blogs::BLOGS_CACHE_PATTERN;
use crate::api::common::{ApiPath, ApiQuery, PaginationQuery};
use crate::api::middleware::{AppState, AuthenticatedUser};
use crate::api::responses::{ApiError, ApiResponse};
use crate::api::tasks::TASKS_CACHE_PATTERN;
use crate::models::{PagedResult, User};

#[derive(Debug, Default, Deserialize)]
pub struct ClearCacheRequest {
    /// Substring to match; empty or missing clears everything
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub pattern: String,
    pub removed: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", delete(delete_user))
        .route("/cache/clear", post(clear_cache))
}

/// GET /api/admin/users
async fn list_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PaginationQuery>,
) -> Result<ApiResponse<PagedResult<User>>, ApiError> {
    let users = state.user_service.list_users(&query.params()).await?;
    Ok(ApiResponse::ok(users))
}

/// DELETE /api/admin/users/{id}
async fn delete_user(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<()>, ApiError> {
    state.user_service.delete_user(&auth.user, id).await?;
    // Their tasks and blogs went with them
    state.response_cache.invalidate(TASKS_CACHE_PATTERN).await;
    state.response_cache.invalidate(BLOGS_CACHE_PATTERN).await;
    tracing::info!(admin = auth.user.id, user = id, "User deleted");
    Ok(ApiResponse::message("User deleted"))
}

/// POST /api/admin/cache/clear
async fn clear_cache(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<ApiResponse<ClearCacheResponse>, ApiError> {
    // The body is optional
    let request: ClearCacheRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ClearCacheRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::validation_error(e.to_string()))?
    };
    let pattern = request.pattern.unwrap_or_default();
    let removed = state
        .response_cache
        .clear_cache(&pattern)
        .await
        .map_err(ApiError::internal)?;

    tracing::info!(pattern = %pattern, removed, "Response cache cleared");
    Ok(ApiResponse::ok(ClearCacheResponse { pattern, removed })
        .with_message(format!("Removed {} cached responses", removed)))
}
