//! Blog API endpoints
//!
//! Reads are public (drafts need the author's session); writes require a
//! session and clear cached `/api/blogs` responses.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::api::common::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::{AppState, AuthenticatedUser, MaybeUser};
use crate::api::responses::{ApiError, ApiResponse};
use crate::models::{Blog, CreateBlogInput, ListParams, PagedResult, UpdateBlogInput};

pub const BLOGS_CACHE_PATTERN: &str = "/api/blogs";

/// Query string for `GET /api/blogs`
#[derive(Debug, Default, Deserialize)]
pub struct BlogListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub author_id: Option<i64>,
    #[serde(default)]
    pub mine: bool,
}

/// Read routes, behind `optional_auth`
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_blogs))
        .route("/{id}", get(get_blog))
}

/// Write routes, behind `require_auth`
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::post(create_blog))
        .route("/{id}", axum::routing::put(update_blog).delete(delete_blog))
}

/// GET /api/blogs
async fn list_blogs(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    ApiQuery(query): ApiQuery<BlogListQuery>,
) -> Result<ApiResponse<PagedResult<Blog>>, ApiError> {
    let params = ListParams::from_query(query.page, query.per_page);
    let page = state
        .blog_service
        .list(viewer.as_ref(), query.author_id, query.mine, &params)
        .await?;
    Ok(ApiResponse::ok(page))
}

/// GET /api/blogs/{id}
async fn get_blog(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<Blog>, ApiError> {
    let blog = state.blog_service.get(viewer.as_ref(), id).await?;
    Ok(ApiResponse::ok(blog))
}

/// POST /api/blogs
async fn create_blog(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiJson(body): ApiJson<CreateBlogInput>,
) -> Result<impl IntoResponse, ApiError> {
    let blog = state.blog_service.create(&auth.user, body).await?;
    state.response_cache.invalidate(BLOGS_CACHE_PATTERN).await;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(blog).with_message("Blog post created"),
    ))
}

/// PUT /api/blogs/{id}
async fn update_blog(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateBlogInput>,
) -> Result<ApiResponse<Blog>, ApiError> {
    let blog = state.blog_service.update(&auth.user, id, body).await?;
    state.response_cache.invalidate(BLOGS_CACHE_PATTERN).await;
    Ok(ApiResponse::ok(blog).with_message("Blog post updated"))
}

/// DELETE /api/blogs/{id}
async fn delete_blog(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<()>, ApiError> {
    state.blog_service.delete(&auth.user, id).await?;
    state.response_cache.invalidate(BLOGS_CACHE_PATTERN).await;
    Ok(ApiResponse::message("Blog post deleted"))
}
