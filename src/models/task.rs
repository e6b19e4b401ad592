//! Task model
//!
//! This module provides:
//! - `Task` entity with embedded subtasks and an optional reminder
//! - The mood / category / priority / status enums stored as lowercase text
//! - Input types for creating and updating tasks
//! - `TaskFilter`, the predicate shared by in-memory filtering and SQL listing
//! - `TaskStats`, the aggregate counts served by `/api/tasks/stats`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Declares a text-backed enum with `as_str`, `ALL`, `Display` and `FromStr`.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal, default = $default:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Convert to the database / wire representation
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(anyhow::anyhow!(concat!("Invalid ", $label, ": {}"), s)),
                }
            }
        }
    };
}

text_enum! {
    /// How the owner felt about a task when they filed it
    Mood, "mood", default = Neutral {
        Happy => "happy",
        Sad => "sad",
        Energetic => "energetic",
        Calm => "calm",
        Stressed => "stressed",
        Focused => "focused",
        Tired => "tired",
        Neutral => "neutral",
    }
}

text_enum! {
    /// Task category
    TaskCategory, "category", default = Personal {
        Work => "work",
        Personal => "personal",
        Health => "health",
        Learning => "learning",
        Shopping => "shopping",
        Other => "other",
    }
}

text_enum! {
    /// Task priority
    Priority, "priority", default = Medium {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

text_enum! {
    /// Task lifecycle status
    TaskStatus, "status", default = Pending {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

/// A checklist item embedded in a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl Subtask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            completed: false,
        }
    }
}

/// Reminder attached to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    /// When the reminder should fire
    pub remind_at: DateTime<Utc>,
    /// Optional note shown with the reminder
    #[serde(default)]
    pub message: Option<String>,
}

/// Task entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: i64,
    /// Task title
    pub title: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    pub mood: Mood,
    pub category: TaskCategory,
    pub priority: Priority,
    pub status: TaskStatus,
    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,
    /// Owning user ID
    pub owner_id: i64,
    /// Embedded checklist
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    /// Optional reminder
    #[serde(default)]
    pub reminder: Option<Reminder>,
    /// Set when the status moves to completed, cleared when it moves away
    pub completed_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new pending task with default enums
    pub fn new(title: impl Into<String>, owner_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by database
            title: title.into(),
            description: String::new(),
            mood: Mood::default(),
            category: TaskCategory::default(),
            priority: Priority::default(),
            status: TaskStatus::default(),
            due_date: None,
            owner_id,
            subtasks: Vec::new(),
            reminder: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Percentage of completed subtasks, rounded to the nearest integer.
    ///
    /// A task without subtasks reports 100 when it is completed and 0
    /// otherwise.
    pub fn completion_percentage(&self) -> u8 {
        if self.subtasks.is_empty() {
            return if self.is_completed() { 100 } else { 0 };
        }
        let done = self.subtasks.iter().filter(|s| s.completed).count();
        (100.0 * done as f64 / self.subtasks.len() as f64).round() as u8
    }

    /// A task is overdue when its due date has passed and it is still open
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => {
                due < now && !matches!(self.status, TaskStatus::Completed | TaskStatus::Cancelled)
            }
            None => false,
        }
    }

    /// Move to a new status, keeping `completed_at` and the subtasks in step
    pub fn set_status(&mut self, status: TaskStatus, now: DateTime<Utc>) {
        if status == TaskStatus::Completed {
            for subtask in &mut self.subtasks {
                subtask.completed = true;
            }
            if self.completed_at.is_none() {
                self.completed_at = Some(now);
            }
        } else {
            self.completed_at = None;
        }
        self.status = status;
    }
}

/// Input for creating a new task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTaskInput {
    /// Task title (required)
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mood: Option<Mood>,
    #[serde(default)]
    pub category: Option<TaskCategory>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub reminder: Option<Reminder>,
}

impl CreateTaskInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_mood(mut self, mood: Mood) -> Self {
        self.mood = Some(mood);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_subtasks(mut self, subtasks: Vec<Subtask>) -> Self {
        self.subtasks = subtasks;
        self
    }
}

/// Input for updating an existing task. Absent fields are left unchanged.
///
/// `due_date` and `reminder` tell an absent key (`None`) apart from an
/// explicit `null` (`Some(None)`), which clears the field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub mood: Option<Mood>,
    pub category: Option<TaskCategory>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub subtasks: Option<Vec<Subtask>>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub reminder: Option<Option<Reminder>>,
}

/// A present key always yields `Some`, even when its value is `null`
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateTaskInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_mood(mut self, mood: Mood) -> Self {
        self.mood = Some(mood);
        self
    }

    /// `None` clears the due date
    pub fn with_due_date(mut self, due_date: Option<DateTime<Utc>>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.mood.is_some()
            || self.category.is_some()
            || self.priority.is_some()
            || self.status.is_some()
            || self.due_date.is_some()
            || self.subtasks.is_some()
            || self.reminder.is_some()
    }

    /// Apply the set fields onto a task
    pub fn apply_to(self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(mood) = self.mood {
            task.mood = mood;
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(subtasks) = self.subtasks {
            task.subtasks = subtasks;
        }
        if let Some(reminder) = self.reminder {
            task.reminder = reminder;
        }
        // Status last so completing a task also completes replaced subtasks
        if let Some(status) = self.status {
            task.set_status(status, now);
        }
        task.updated_at = now;
    }
}

/// Filter over a user's tasks.
///
/// The same predicate is evaluated in memory by [`TaskFilter::matches`] and
/// pushed into SQL by the task repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFilter {
    pub mood: Option<Mood>,
    pub status: Option<TaskStatus>,
    pub category: Option<TaskCategory>,
    pub priority: Option<Priority>,
    /// `true` keeps only completed tasks, `false` keeps every other status
    pub completed: Option<bool>,
    /// Case-insensitive substring of the title or description
    pub search: Option<String>,
}

impl TaskFilter {
    pub fn by_mood(mood: Mood) -> Self {
        Self {
            mood: Some(mood),
            ..Default::default()
        }
    }

    pub fn by_completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Default::default()
        }
    }

    /// Non-empty, trimmed search term
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.mood.is_none()
            && self.status.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.completed.is_none()
            && self.search_term().is_none()
    }

    /// Check whether a single task passes every set criterion
    pub fn matches(&self, task: &Task) -> bool {
        if self.mood.is_some_and(|m| m != task.mood) {
            return false;
        }
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.category.is_some_and(|c| c != task.category) {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        if self.completed.is_some_and(|c| c != task.is_completed()) {
            return false;
        }
        if let Some(term) = self.search_term() {
            let term = term.to_lowercase();
            if !task.title.to_lowercase().contains(&term)
                && !task.description.to_lowercase().contains(&term)
            {
                return false;
            }
        }
        true
    }

    /// Keep the tasks that match, preserving order
    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|t| self.matches(t)).collect()
    }
}

/// Sort order for task listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSort {
    /// Most recently created first
    #[default]
    Newest,
    Oldest,
    /// Earliest due date first, undated tasks last
    DueDate,
    /// Urgent first
    Priority,
    /// Alphabetical by title
    Title,
}

impl TaskSort {
    /// SQL ORDER BY clause, valid for both SQLite and MySQL
    pub fn order_by(&self) -> &'static str {
        match self {
            TaskSort::Newest => "created_at DESC, id DESC",
            TaskSort::Oldest => "created_at ASC, id ASC",
            TaskSort::DueDate => "due_date IS NULL, due_date ASC, id ASC",
            TaskSort::Priority => {
                "CASE priority WHEN 'urgent' THEN 0 WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END, created_at DESC"
            }
            TaskSort::Title => "title ASC, id ASC",
        }
    }
}

impl FromStr for TaskSort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newest" | "created_desc" => Ok(TaskSort::Newest),
            "oldest" | "created_asc" => Ok(TaskSort::Oldest),
            "due_date" | "due" => Ok(TaskSort::DueDate),
            "priority" => Ok(TaskSort::Priority),
            "title" => Ok(TaskSort::Title),
            _ => Err(anyhow::anyhow!("Invalid sort: {}", s)),
        }
    }
}

/// Aggregate task counts for one owner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: i64,
    pub completed: i64,
    pub overdue: i64,
    /// Completed tasks as a rounded percentage of all tasks
    pub completion_rate: u8,
    /// Count per status, every status present
    pub by_status: BTreeMap<String, i64>,
    /// Count per mood, every mood present
    pub by_mood: BTreeMap<String, i64>,
}

impl TaskStats {
    /// Build stats from grouped counts, filling absent groups with zero
    pub fn from_counts(
        status_counts: Vec<(String, i64)>,
        mood_counts: Vec<(String, i64)>,
        overdue: i64,
    ) -> Self {
        let mut by_status: BTreeMap<String, i64> = TaskStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        for (status, count) in status_counts {
            *by_status.entry(status).or_insert(0) += count;
        }

        let mut by_mood: BTreeMap<String, i64> = Mood::ALL
            .iter()
            .map(|m| (m.as_str().to_string(), 0))
            .collect();
        for (mood, count) in mood_counts {
            *by_mood.entry(mood).or_insert(0) += count;
        }

        let total: i64 = by_status.values().sum();
        let completed = by_status
            .get(TaskStatus::Completed.as_str())
            .copied()
            .unwrap_or(0);
        let completion_rate = if total == 0 {
            0
        } else {
            (100.0 * completed as f64 / total as f64).round() as u8
        };

        Self {
            total,
            completed,
            overdue,
            completion_rate,
            by_status,
            by_mood,
        }
    }

    /// Compute stats directly over a task list
    pub fn from_tasks(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let mut status_counts: BTreeMap<String, i64> = BTreeMap::new();
        let mut mood_counts: BTreeMap<String, i64> = BTreeMap::new();
        for task in tasks {
            *status_counts.entry(task.status.to_string()).or_insert(0) += 1;
            *mood_counts.entry(task.mood.to_string()).or_insert(0) += 1;
        }
        let overdue = tasks.iter().filter(|t| t.is_overdue(now)).count() as i64;
        Self::from_counts(
            status_counts.into_iter().collect(),
            mood_counts.into_iter().collect(),
            overdue,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task_with(subtasks: &[bool], status: TaskStatus) -> Task {
        let mut task = Task::new("t", 1);
        task.status = status;
        task.subtasks = subtasks
            .iter()
            .enumerate()
            .map(|(i, done)| Subtask {
                title: format!("step {}", i),
                completed: *done,
            })
            .collect();
        task
    }

    #[test]
    fn test_task_new_defaults() {
        let task = Task::new("Write report", 7);
        assert_eq!(task.id, 0);
        assert_eq!(task.owner_id, 7);
        assert_eq!(task.mood, Mood::Neutral);
        assert_eq!(task.category, TaskCategory::Personal);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.subtasks.is_empty());
    }

    #[test]
    fn test_completion_percentage_without_subtasks() {
        assert_eq!(task_with(&[], TaskStatus::Pending).completion_percentage(), 0);
        assert_eq!(task_with(&[], TaskStatus::InProgress).completion_percentage(), 0);
        assert_eq!(task_with(&[], TaskStatus::Completed).completion_percentage(), 100);
    }

    #[test]
    fn test_completion_percentage_rounds() {
        assert_eq!(task_with(&[true, false, false], TaskStatus::Pending).completion_percentage(), 33);
        assert_eq!(task_with(&[true, true, false], TaskStatus::Pending).completion_percentage(), 67);
        assert_eq!(task_with(&[true, false], TaskStatus::Pending).completion_percentage(), 50);
        assert_eq!(task_with(&[true, true], TaskStatus::Pending).completion_percentage(), 100);
    }

    #[test]
    fn test_completion_percentage_ignores_status_when_subtasks_exist() {
        assert_eq!(task_with(&[false, false], TaskStatus::Completed).completion_percentage(), 0);
    }

    #[test]
    fn test_is_overdue() {
        let now = Utc::now();
        let mut task = Task::new("t", 1);
        assert!(!task.is_overdue(now));

        task.due_date = Some(now - Duration::hours(1));
        assert!(task.is_overdue(now));

        task.status = TaskStatus::Completed;
        assert!(!task.is_overdue(now));

        task.status = TaskStatus::Cancelled;
        assert!(!task.is_overdue(now));

        task.status = TaskStatus::Pending;
        task.due_date = Some(now + Duration::hours(1));
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn test_set_status_completed_marks_subtasks() {
        let now = Utc::now();
        let mut task = task_with(&[true, false, false], TaskStatus::InProgress);
        task.set_status(TaskStatus::Completed, now);

        assert!(task.subtasks.iter().all(|s| s.completed));
        assert_eq!(task.completed_at, Some(now));
        assert_eq!(task.completion_percentage(), 100);

        task.set_status(TaskStatus::Pending, now);
        assert!(task.completed_at.is_none());
        // Reopening keeps the checklist as it was
        assert!(task.subtasks.iter().all(|s| s.completed));
    }

    #[test]
    fn test_update_input_applies_only_set_fields() {
        let now = Utc::now();
        let mut task = Task::new("Old", 1);
        task.description = "keep".to_string();

        UpdateTaskInput::new()
            .with_title("New")
            .with_mood(Mood::Happy)
            .apply_to(&mut task, now);

        assert_eq!(task.title, "New");
        assert_eq!(task.mood, Mood::Happy);
        assert_eq!(task.description, "keep");
        assert_eq!(task.updated_at, now);
    }

    #[test]
    fn test_update_input_null_clears_due_date_and_reminder() {
        let now = Utc::now();
        let mut task = Task::new("t", 1);
        task.due_date = Some(now);
        task.reminder = Some(Reminder {
            remind_at: now,
            message: None,
        });

        let absent: UpdateTaskInput = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert!(absent.due_date.is_none());
        absent.apply_to(&mut task, now);
        assert!(task.due_date.is_some());
        assert!(task.reminder.is_some());

        let cleared: UpdateTaskInput =
            serde_json::from_str(r#"{"due_date":null,"reminder":null}"#).unwrap();
        assert!(cleared.has_changes());
        cleared.apply_to(&mut task, now);
        assert!(task.due_date.is_none());
        assert!(task.reminder.is_none());

        UpdateTaskInput::new()
            .with_due_date(Some(now))
            .apply_to(&mut task, now);
        assert_eq!(task.due_date, Some(now));
    }

    #[test]
    fn test_update_input_has_changes() {
        assert!(!UpdateTaskInput::new().has_changes());
        assert!(UpdateTaskInput::new().with_status(TaskStatus::Completed).has_changes());
    }

    #[test]
    fn test_enum_parse_and_display() {
        assert_eq!(Mood::from_str("HAPPY").unwrap(), Mood::Happy);
        assert_eq!(TaskStatus::from_str("in_progress").unwrap(), TaskStatus::InProgress);
        assert_eq!(TaskStatus::InProgress.to_string(), "in_progress");
        assert_eq!(Priority::from_str(" urgent ").unwrap(), Priority::Urgent);
        assert!(TaskCategory::from_str("hobby").is_err());
        assert!(Mood::from_str("ecstatic").is_err());
    }

    #[test]
    fn test_enum_serde_uses_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let mood: Mood = serde_json::from_str("\"calm\"").unwrap();
        assert_eq!(mood, Mood::Calm);
    }

    #[test]
    fn test_filter_by_mood() {
        let mut happy = Task::new("a", 1);
        happy.mood = Mood::Happy;
        let mut sad = Task::new("b", 1);
        sad.mood = Mood::Sad;
        let tasks = vec![happy, sad];

        let filtered = TaskFilter::by_mood(Mood::Happy).apply(&tasks);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "a");
    }

    #[test]
    fn test_filter_by_completion() {
        let tasks = vec![
            task_with(&[], TaskStatus::Completed),
            task_with(&[], TaskStatus::Pending),
            task_with(&[], TaskStatus::Cancelled),
        ];

        assert_eq!(TaskFilter::by_completion(true).apply(&tasks).len(), 1);
        assert_eq!(TaskFilter::by_completion(false).apply(&tasks).len(), 2);
        assert_eq!(TaskFilter::default().apply(&tasks).len(), 3);
    }

    #[test]
    fn test_filter_search_is_case_insensitive() {
        let mut task = Task::new("Buy Groceries", 1);
        task.description = "Milk and EGGS".to_string();

        let mut filter = TaskFilter {
            search: Some("groc".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&task));

        filter.search = Some("eggs".to_string());
        assert!(filter.matches(&task));

        filter.search = Some("bread".to_string());
        assert!(!filter.matches(&task));

        filter.search = Some("   ".to_string());
        assert!(filter.matches(&task));
        assert!(filter.is_empty());
    }

    #[test]
    fn test_sort_from_str() {
        assert_eq!(TaskSort::from_str("due_date").unwrap(), TaskSort::DueDate);
        assert_eq!(TaskSort::from_str("Priority").unwrap(), TaskSort::Priority);
        assert!(TaskSort::from_str("random").is_err());
    }

    #[test]
    fn test_stats_from_counts_fills_zeroes() {
        let stats = TaskStats::from_counts(
            vec![("completed".to_string(), 1), ("pending".to_string(), 2)],
            vec![("happy".to_string(), 3)],
            1,
        );

        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.completion_rate, 33);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.by_status.len(), TaskStatus::ALL.len());
        assert_eq!(stats.by_status["in_progress"], 0);
        assert_eq!(stats.by_mood.len(), Mood::ALL.len());
        assert_eq!(stats.by_mood["happy"], 3);
        assert_eq!(stats.by_mood["sad"], 0);
    }

    #[test]
    fn test_stats_empty() {
        let stats = TaskStats::from_tasks(&[], Utc::now());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.completion_rate, 0);
    }
}
