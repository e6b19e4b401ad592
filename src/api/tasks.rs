//! Task API endpoints
//!
//! All routes require a session. Reads go through the response cache; every
//! write clears cached `/api/tasks` responses.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{parse_optional, ApiJson, ApiPath, ApiQuery, PaginationQuery};
use crate::api::middleware::{AppState, AuthenticatedUser};
use crate::api::responses::{ApiError, ApiResponse};
use crate::models::{
    CreateTaskInput, ListParams, Mood, PagedResult, Task, TaskFilter, TaskSort, TaskStats,
    UpdateTaskInput,
};

/// Substring of every cached task response key
pub const TASKS_CACHE_PATTERN: &str = "/api/tasks";

/// Task plus derived progress fields
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    #[serde(flatten)]
    pub task: Task,
    pub completion_percentage: u8,
    pub is_overdue: bool,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            completion_percentage: task.completion_percentage(),
            is_overdue: task.is_overdue(chrono::Utc::now()),
            task,
        }
    }
}

/// Query string for `GET /api/tasks`
#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub mood: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub completed: Option<bool>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl TaskListQuery {
    fn filter(&self) -> Result<TaskFilter, ApiError> {
        Ok(TaskFilter {
            mood: parse_optional("mood", self.mood.as_deref())?,
            status: parse_optional("status", self.status.as_deref())?,
            category: parse_optional("category", self.category.as_deref())?,
            priority: parse_optional("priority", self.priority.as_deref())?,
            completed: self.completed,
            search: self.search.clone(),
        })
    }

    fn sort(&self) -> Result<TaskSort, ApiError> {
        Ok(parse_optional("sort", self.sort.as_deref())?.unwrap_or_default())
    }

    fn params(&self) -> ListParams {
        ListParams::from_query(self.page, self.per_page)
    }
}

#[derive(Debug, Deserialize)]
pub struct AddSubtaskRequest {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToggleSubtaskQuery {
    pub completed: Option<bool>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/stats", get(task_stats))
        .route("/mood/{mood}", get(list_tasks_by_mood))
        .route(
            "/{id}",
            get(get_task).put(update_task).patch(update_task).delete(delete_task),
        )
        .route("/{id}/subtasks", post(add_subtask))
        .route("/{id}/subtasks/{index}", patch(toggle_subtask))
}

fn paged(page: PagedResult<Task>) -> PagedResult<TaskResponse> {
    page.map(TaskResponse::from)
}

/// GET /api/tasks
async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiQuery(query): ApiQuery<TaskListQuery>,
) -> Result<ApiResponse<PagedResult<TaskResponse>>, ApiError> {
    let filter = query.filter()?;
    let page = state
        .task_service
        .list(&auth.user, &filter, query.sort()?, &query.params())
        .await?;
    Ok(ApiResponse::ok(paged(page)))
}

/// POST /api/tasks
async fn create_task(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiJson(body): ApiJson<CreateTaskInput>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.task_service.create(&auth.user, body).await?;
    state.response_cache.invalidate(TASKS_CACHE_PATTERN).await;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(TaskResponse::from(task)).with_message("Task created"),
    ))
}

/// GET /api/tasks/stats
async fn task_stats(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<ApiResponse<TaskStats>, ApiError> {
    Ok(ApiResponse::ok(state.task_service.stats(&auth.user).await?))
}

/// GET /api/tasks/mood/{mood}
async fn list_tasks_by_mood(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiPath(mood): ApiPath<String>,
    ApiQuery(query): ApiQuery<PaginationQuery>,
) -> Result<ApiResponse<PagedResult<TaskResponse>>, ApiError> {
    let mood: Mood = mood
        .parse()
        .map_err(|e: anyhow::Error| ApiError::validation_error(e.to_string()))?;
    let page = state
        .task_service
        .list_by_mood(&auth.user, mood, &query.params())
        .await?;
    Ok(ApiResponse::ok(paged(page)))
}

/// GET /api/tasks/{id}
async fn get_task(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<TaskResponse>, ApiError> {
    let task = state.task_service.get(&auth.user, id).await?;
    Ok(ApiResponse::ok(task.into()))
}

/// PUT / PATCH /api/tasks/{id}
async fn update_task(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateTaskInput>,
) -> Result<ApiResponse<TaskResponse>, ApiError> {
    let task = state.task_service.update(&auth.user, id, body).await?;
    state.response_cache.invalidate(TASKS_CACHE_PATTERN).await;
    Ok(ApiResponse::ok(TaskResponse::from(task)).with_message("Task updated"))
}

/// DELETE /api/tasks/{id}
async fn delete_task(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<()>, ApiError> {
    state.task_service.delete(&auth.user, id).await?;
    state.response_cache.invalidate(TASKS_CACHE_PATTERN).await;
    Ok(ApiResponse::message("Task deleted"))
}

/// POST /api/tasks/{id}/subtasks
async fn add_subtask(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<AddSubtaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .task_service
        .add_subtask(&auth.user, id, &body.title)
        .await?;
    state.response_cache.invalidate(TASKS_CACHE_PATTERN).await;
    Ok((StatusCode::CREATED, ApiResponse::ok(TaskResponse::from(task))))
}

/// PATCH /api/tasks/{id}/subtasks/{index}
///
/// Flips the subtask, or sets it with `?completed=true|false`.
async fn toggle_subtask(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiPath((id, index)): ApiPath<(i64, usize)>,
    ApiQuery(query): ApiQuery<ToggleSubtaskQuery>,
) -> Result<ApiResponse<TaskResponse>, ApiError> {
    let task = state
        .task_service
        .toggle_subtask(&auth.user, id, index, query.completed)
        .await?;
    state.response_cache.invalidate(TASKS_CACHE_PATTERN).await;
    Ok(ApiResponse::ok(task.into()))
}
