//! Data models
//!
//! This module contains the data structures used throughout Taskly:
//! - Database entities (User, Session, Task, Blog)
//! - API request types (create/update inputs, filters)
//! - Pagination and statistics containers

mod blog;
mod pagination;
mod session;
mod task;
mod user;

pub use blog::{Blog, BlogQuery, CreateBlogInput, UpdateBlogInput};
pub use pagination::{ListParams, PagedResult};
pub use session::Session;
pub use task::{
    CreateTaskInput, Mood, Priority, Reminder, Subtask, Task, TaskCategory, TaskFilter, TaskSort,
    TaskStats, TaskStatus, UpdateTaskInput,
};
pub use user::{CreateUserInput, UpdateProfileInput, User, UserPreferences, UserProfile, UserRole};
