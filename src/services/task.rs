//! Task service
//!
//! Business rules for tasks: validation, ownership checks, subtask edits and
//! per-owner statistics. Admins may read and modify any task.

use crate::db::repositories::TaskRepository;
use crate::models::{
    CreateTaskInput, ListParams, Mood, PagedResult, Subtask, Task, TaskFilter, TaskSort,
    TaskStats, UpdateTaskInput, User,
};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

pub const TITLE_MAX_LEN: usize = 200;

/// Error types for task service operations
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    #[error("Task not found: {0}")]
    NotFound(i64),

    #[error("Subtask not found: {0}")]
    SubtaskNotFound(usize),

    /// The caller neither owns the task nor is an admin
    #[error("You do not have access to this task")]
    Forbidden,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Task service
pub struct TaskService {
    repo: Arc<dyn TaskRepository>,
}

impl TaskService {
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self { repo }
    }

    /// Create a task owned by `owner`.
    ///
    /// Without an explicit mood the owner's preferred default mood is used.
    pub async fn create(&self, owner: &User, input: CreateTaskInput) -> Result<Task, TaskServiceError> {
        let title = validate_title(&input.title)?;
        validate_subtasks(&input.subtasks)?;

        let now = Utc::now();
        let mut task = Task::new(title, owner.id);
        task.description = input.description.unwrap_or_default();
        task.mood = input
            .mood
            .or(owner.preferences.default_mood)
            .unwrap_or_default();
        task.category = input.category.unwrap_or_default();
        task.priority = input.priority.unwrap_or_default();
        task.due_date = input.due_date;
        task.subtasks = input.subtasks;
        task.reminder = input.reminder;
        task.set_status(input.status.unwrap_or_default(), now);

        let created = self.repo.create(&task).await.context("Failed to create task")?;
        tracing::debug!(task_id = created.id, owner_id = owner.id, "Created task");
        Ok(created)
    }

    /// Fetch a task the caller may see
    pub async fn get(&self, actor: &User, id: i64) -> Result<Task, TaskServiceError> {
        let task = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get task")?
            .ok_or(TaskServiceError::NotFound(id))?;

        if !actor.can_access(task.owner_id) {
            return Err(TaskServiceError::Forbidden);
        }
        Ok(task)
    }

    /// One page of the caller's own tasks
    pub async fn list(
        &self,
        actor: &User,
        filter: &TaskFilter,
        sort: TaskSort,
        params: &ListParams,
    ) -> Result<PagedResult<Task>, TaskServiceError> {
        let (tasks, total) = self
            .repo
            .list(actor.id, filter, sort, params)
            .await
            .context("Failed to list tasks")?;
        Ok(PagedResult::new(tasks, total, params))
    }

    pub async fn list_by_mood(
        &self,
        actor: &User,
        mood: Mood,
        params: &ListParams,
    ) -> Result<PagedResult<Task>, TaskServiceError> {
        self.list(actor, &TaskFilter::by_mood(mood), TaskSort::Newest, params)
            .await
    }

    /// Apply a partial update.
    ///
    /// Moving to `completed` ticks every subtask.
    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        mut input: UpdateTaskInput,
    ) -> Result<Task, TaskServiceError> {
        if !input.has_changes() {
            return Err(TaskServiceError::ValidationError(
                "No fields to update".to_string(),
            ));
        }
        if let Some(title) = input.title.as_deref() {
            input.title = Some(validate_title(title)?);
        }
        if let Some(subtasks) = input.subtasks.as_deref() {
            validate_subtasks(subtasks)?;
        }

        let mut task = self.get(actor, id).await?;
        input.apply_to(&mut task, Utc::now());

        let updated = self.repo.update(&task).await.context("Failed to update task")?;
        Ok(updated)
    }

    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), TaskServiceError> {
        self.get(actor, id).await?;
        self.repo.delete(id).await.context("Failed to delete task")?;
        tracing::debug!(task_id = id, by = actor.id, "Deleted task");
        Ok(())
    }

    /// Append an unchecked subtask
    pub async fn add_subtask(
        &self,
        actor: &User,
        id: i64,
        title: &str,
    ) -> Result<Task, TaskServiceError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TaskServiceError::ValidationError(
                "Subtask title is required".to_string(),
            ));
        }

        let mut task = self.get(actor, id).await?;
        task.subtasks.push(Subtask::new(title));
        task.updated_at = Utc::now();

        let updated = self.repo.update(&task).await.context("Failed to add subtask")?;
        Ok(updated)
    }

    /// Flip a subtask, or set it explicitly when `completed` is given
    pub async fn toggle_subtask(
        &self,
        actor: &User,
        id: i64,
        index: usize,
        completed: Option<bool>,
    ) -> Result<Task, TaskServiceError> {
        let mut task = self.get(actor, id).await?;
        let subtask = task
            .subtasks
            .get_mut(index)
            .ok_or(TaskServiceError::SubtaskNotFound(index))?;
        subtask.completed = completed.unwrap_or(!subtask.completed);
        task.updated_at = Utc::now();

        let updated = self
            .repo
            .update(&task)
            .await
            .context("Failed to update subtask")?;
        Ok(updated)
    }

    /// Aggregate counts over the caller's tasks
    pub async fn stats(&self, actor: &User) -> Result<TaskStats, TaskServiceError> {
        let stats = self
            .repo
            .stats(actor.id, Utc::now())
            .await
            .context("Failed to compute task stats")?;
        Ok(stats)
    }
}

fn validate_title(title: &str) -> Result<String, TaskServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TaskServiceError::ValidationError("Title is required".to_string()));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(TaskServiceError::ValidationError(format!(
            "Title cannot exceed {} characters",
            TITLE_MAX_LEN
        )));
    }
    Ok(title.to_string())
}

fn validate_subtasks(subtasks: &[Subtask]) -> Result<(), TaskServiceError> {
    if subtasks.iter().any(|s| s.title.trim().is_empty()) {
        return Err(TaskServiceError::ValidationError(
            "Subtask title is required".to_string(),
        ));
    }
    Ok(())
}
