//! Task repository
//!
//! Database operations for tasks. Subtasks and the reminder are stored as
//! JSON text columns. Listing pushes `TaskFilter` into a WHERE clause so
//! pagination totals stay correct.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, Reminder, Task, TaskFilter, TaskSort, TaskStats, TaskStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

use super::{
    bind_mysql, bind_mysql_scalar, bind_sqlite, bind_sqlite_scalar, from_json_column, mysql_pool,
    sqlite_pool, to_json_column, SqlValue, WhereClause,
};

const TASK_COLUMNS: &str = "id, title, description, mood, category, priority, status, due_date, \
     owner_id, subtasks, reminder, completed_at, created_at, updated_at";

/// Task repository trait
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Insert a task, returning it with its new ID
    async fn create(&self, task: &Task) -> Result<Task>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Task>>;

    /// Overwrite every mutable column of an existing task
    async fn update(&self, task: &Task) -> Result<Task>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// One page of an owner's tasks plus the total matching count
    async fn list(
        &self,
        owner_id: i64,
        filter: &TaskFilter,
        sort: TaskSort,
        params: &ListParams,
    ) -> Result<(Vec<Task>, i64)>;

    /// Grouped counts for one owner
    async fn stats(&self, owner_id: i64, now: DateTime<Utc>) -> Result<TaskStats>;
}

/// SQLx-based task repository implementation
pub struct SqlxTaskRepository {
    pool: DynDatabasePool,
}

impl SqlxTaskRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TaskRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Escape LIKE wildcards using `!` as the escape character
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '!' | '%' | '_') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Translate a filter into SQL for one owner's tasks
fn task_where(owner_id: i64, filter: &TaskFilter) -> WhereClause {
    let mut clause = WhereClause::new();
    clause.push("owner_id = ?", [SqlValue::Int(owner_id)]);

    if let Some(mood) = filter.mood {
        clause.push("mood = ?", [SqlValue::Text(mood.as_str().to_string())]);
    }
    if let Some(status) = filter.status {
        clause.push("status = ?", [SqlValue::Text(status.as_str().to_string())]);
    }
    if let Some(category) = filter.category {
        clause.push("category = ?", [SqlValue::Text(category.as_str().to_string())]);
    }
    if let Some(priority) = filter.priority {
        clause.push("priority = ?", [SqlValue::Text(priority.as_str().to_string())]);
    }
    if let Some(completed) = filter.completed {
        let op = if completed { "status = ?" } else { "status <> ?" };
        clause.push(op, [SqlValue::Text(TaskStatus::Completed.as_str().to_string())]);
    }
    if let Some(term) = filter.search_term() {
        let pattern = like_pattern(term);
        clause.push(
            "(LOWER(title) LIKE ? ESCAPE '!' OR LOWER(description) LIKE ? ESCAPE '!')",
            [SqlValue::Text(pattern.clone()), SqlValue::Text(pattern)],
        );
    }
    clause
}

#[async_trait]
impl TaskRepository for SqlxTaskRepository {
    async fn create(&self, task: &Task) -> Result<Task> {
        let sql = r#"
            INSERT INTO tasks (title, description, mood, category, priority, status, due_date,
                               owner_id, subtasks, reminder, completed_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;
        let subtasks = to_json_column(&task.subtasks)?;
        let reminder = task.reminder.as_ref().map(to_json_column).transpose()?;

        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&task.title)
                .bind(&task.description)
                .bind(task.mood.as_str())
                .bind(task.category.as_str())
                .bind(task.priority.as_str())
                .bind(task.status.as_str())
                .bind(task.due_date)
                .bind(task.owner_id)
                .bind(&subtasks)
                .bind(&reminder)
                .bind(task.completed_at)
                .bind(task.created_at)
                .bind(task.updated_at)
                .execute(sqlite_pool(&self.pool)?)
                .await
                .context("Failed to create task")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&task.title)
                .bind(&task.description)
                .bind(task.mood.as_str())
                .bind(task.category.as_str())
                .bind(task.priority.as_str())
                .bind(task.status.as_str())
                .bind(task.due_date)
                .bind(task.owner_id)
                .bind(&subtasks)
                .bind(&reminder)
                .bind(task.completed_at)
                .bind(task.created_at)
                .bind(task.updated_at)
                .execute(mysql_pool(&self.pool)?)
                .await
                .context("Failed to create task")?
                .last_insert_id() as i64,
        };

        let mut created = task.clone();
        created.id = id;
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(sqlite_pool(&self.pool)?)
                    .await
                    .context("Failed to get task by ID")?;
                row.as_ref().map(row_to_task_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(mysql_pool(&self.pool)?)
                    .await
                    .context("Failed to get task by ID")?;
                row.as_ref().map(row_to_task_mysql).transpose()
            }
        }
    }

    async fn update(&self, task: &Task) -> Result<Task> {
        let sql = r#"
            UPDATE tasks
            SET title = ?, description = ?, mood = ?, category = ?, priority = ?, status = ?,
                due_date = ?, subtasks = ?, reminder = ?, completed_at = ?, updated_at = ?
            WHERE id = ?
        "#;
        let subtasks = to_json_column(&task.subtasks)?;
        let reminder = task.reminder.as_ref().map(to_json_column).transpose()?;

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&task.title)
                    .bind(&task.description)
                    .bind(task.mood.as_str())
                    .bind(task.category.as_str())
                    .bind(task.priority.as_str())
                    .bind(task.status.as_str())
                    .bind(task.due_date)
                    .bind(&subtasks)
                    .bind(&reminder)
                    .bind(task.completed_at)
                    .bind(task.updated_at)
                    .bind(task.id)
                    .execute(sqlite_pool(&self.pool)?)
                    .await
                    .context("Failed to update task")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&task.title)
                    .bind(&task.description)
                    .bind(task.mood.as_str())
                    .bind(task.category.as_str())
                    .bind(task.priority.as_str())
                    .bind(task.status.as_str())
                    .bind(task.due_date)
                    .bind(&subtasks)
                    .bind(&reminder)
                    .bind(task.completed_at)
                    .bind(task.updated_at)
                    .bind(task.id)
                    .execute(mysql_pool(&self.pool)?)
                    .await
                    .context("Failed to update task")?;
            }
        }
        Ok(task.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM tasks WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(sqlite_pool(&self.pool)?)
                .await
                .context("Failed to delete task")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(mysql_pool(&self.pool)?)
                .await
                .context("Failed to delete task")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list(
        &self,
        owner_id: i64,
        filter: &TaskFilter,
        sort: TaskSort,
        params: &ListParams,
    ) -> Result<(Vec<Task>, i64)> {
        let clause = task_where(owner_id, filter);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_tasks_sqlite(sqlite_pool(&self.pool)?, &clause, sort, params).await
            }
            DatabaseDriver::Mysql => {
                list_tasks_mysql(mysql_pool(&self.pool)?, &clause, sort, params).await
            }
        }
    }

    async fn stats(&self, owner_id: i64, now: DateTime<Utc>) -> Result<TaskStats> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => task_stats_sqlite(sqlite_pool(&self.pool)?, owner_id, now).await,
            DatabaseDriver::Mysql => task_stats_mysql(mysql_pool(&self.pool)?, owner_id, now).await,
        }
    }
}

const OVERDUE_SQL: &str = "SELECT COUNT(*) FROM tasks WHERE owner_id = ? AND due_date IS NOT NULL \
     AND due_date < ? AND status NOT IN ('completed', 'cancelled')";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_tasks_sqlite(
    pool: &SqlitePool,
    clause: &WhereClause,
    sort: TaskSort,
    params: &ListParams,
) -> Result<(Vec<Task>, i64)> {
    let where_sql = clause.sql();

    let count_sql = format!("SELECT COUNT(*) FROM tasks{}", where_sql);
    let total: i64 = bind_sqlite_scalar(sqlx::query_scalar(&count_sql), clause.values())
        .fetch_one(pool)
        .await
        .context("Failed to count tasks")?;

    let list_sql = format!(
        "SELECT {} FROM tasks{} ORDER BY {} LIMIT ? OFFSET ?",
        TASK_COLUMNS,
        where_sql,
        sort.order_by()
    );
    let rows = bind_sqlite(sqlx::query(&list_sql), clause.values())
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list tasks")?;

    let tasks = rows.iter().map(row_to_task_sqlite).collect::<Result<Vec<_>>>()?;
    Ok((tasks, total))
}

async fn task_stats_sqlite(pool: &SqlitePool, owner_id: i64, now: DateTime<Utc>) -> Result<TaskStats> {
    let by_status = sqlx::query(
        "SELECT status AS grp, COUNT(*) AS cnt FROM tasks WHERE owner_id = ? GROUP BY status",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
    .context("Failed to count tasks by status")?;

    let by_mood = sqlx::query(
        "SELECT mood AS grp, COUNT(*) AS cnt FROM tasks WHERE owner_id = ? GROUP BY mood",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
    .context("Failed to count tasks by mood")?;

    let overdue: i64 = sqlx::query_scalar(OVERDUE_SQL)
        .bind(owner_id)
        .bind(now)
        .fetch_one(pool)
        .await
        .context("Failed to count overdue tasks")?;

    let pairs = |rows: Vec<sqlx::sqlite::SqliteRow>| -> Vec<(String, i64)> {
        rows.iter().map(|r| (r.get("grp"), r.get("cnt"))).collect()
    };
    Ok(TaskStats::from_counts(pairs(by_status), pairs(by_mood), overdue))
}

fn row_to_task_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Task> {
    let mood: String = row.get("mood");
    let category: String = row.get("category");
    let priority: String = row.get("priority");
    let status: String = row.get("status");
    Ok(Task {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        mood: FromStr::from_str(&mood)?,
        category: FromStr::from_str(&category)?,
        priority: FromStr::from_str(&priority)?,
        status: FromStr::from_str(&status)?,
        due_date: row.get("due_date"),
        owner_id: row.get("owner_id"),
        subtasks: from_json_column(row.get("subtasks"))?,
        reminder: from_json_column::<Option<Reminder>>(row.get("reminder"))?,
        completed_at: row.get("completed_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_tasks_mysql(
    pool: &MySqlPool,
    clause: &WhereClause,
    sort: TaskSort,
    params: &ListParams,
) -> Result<(Vec<Task>, i64)> {
    let where_sql = clause.sql();

    let count_sql = format!("SELECT COUNT(*) FROM tasks{}", where_sql);
    let total: i64 = bind_mysql_scalar(sqlx::query_scalar(&count_sql), clause.values())
        .fetch_one(pool)
        .await
        .context("Failed to count tasks")?;

    let list_sql = format!(
        "SELECT {} FROM tasks{} ORDER BY {} LIMIT ? OFFSET ?",
        TASK_COLUMNS,
        where_sql,
        sort.order_by()
    );
    let rows = bind_mysql(sqlx::query(&list_sql), clause.values())
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list tasks")?;

    let tasks = rows.iter().map(row_to_task_mysql).collect::<Result<Vec<_>>>()?;
    Ok((tasks, total))
}

async fn task_stats_mysql(pool: &MySqlPool, owner_id: i64, now: DateTime<Utc>) -> Result<TaskStats> {
    let by_status = sqlx::query(
        "SELECT status AS grp, COUNT(*) AS cnt FROM tasks WHERE owner_id = ? GROUP BY status",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
    .context("Failed to count tasks by status")?;

    let by_mood = sqlx::query(
        "SELECT mood AS grp, COUNT(*) AS cnt FROM tasks WHERE owner_id = ? GROUP BY mood",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
    .context("Failed to count tasks by mood")?;

    let overdue: i64 = sqlx::query_scalar(OVERDUE_SQL)
        .bind(owner_id)
        .bind(now)
        .fetch_one(pool)
        .await
        .context("Failed to count overdue tasks")?;

    let pairs = |rows: Vec<sqlx::mysql::MySqlRow>| -> Vec<(String, i64)> {
        rows.iter().map(|r| (r.get("grp"), r.get("cnt"))).collect()
    };
    Ok(TaskStats::from_counts(pairs(by_status), pairs(by_mood), overdue))
}

fn row_to_task_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Task> {
    let mood: String = row.get("mood");
    let category: String = row.get("category");
    let priority: String = row.get("priority");
    let status: String = row.get("status");
    Ok(Task {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        mood: FromStr::from_str(&mood)?,
        category: FromStr::from_str(&category)?,
        priority: FromStr::from_str(&priority)?,
        status: FromStr::from_str(&status)?,
        due_date: row.get("due_date"),
        owner_id: row.get("owner_id"),
        subtasks: from_json_column(row.get("subtasks"))?,
        reminder: from_json_column::<Option<Reminder>>(row.get("reminder"))?,
        completed_at: row.get("completed_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
