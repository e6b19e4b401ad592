//! Services layer - Business logic
//!
//! Services enforce validation and ownership rules and coordinate the
//! repositories. Each has its own `thiserror` error enum that the API layer
//! maps to HTTP statuses.

pub mod blog;
pub mod login_throttle;
pub mod mood;
pub mod password;
pub mod task;
pub mod user;

pub use blog::{BlogService, BlogServiceError};
pub use login_throttle::LoginThrottle;
pub use mood::{all_moods, suggestions_for, weather_suggestions, MoodInfo, MoodSuggestions, WeatherSuggestions};
pub use password::{hash_password, verify_password};
pub use task::{TaskService, TaskServiceError};
pub use user::{LoginInput, UserService, UserServiceError};
