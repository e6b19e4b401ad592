//! User service
//!
//! Registration, login and session handling, profile updates and the
//! admin-side user listing. The first account registered becomes an admin.
//! Sessions are opaque random tokens stored server-side.

use crate::config::AuthConfig;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{
    CreateUserInput, ListParams, PagedResult, Session, UpdateProfileInput, User, UserRole,
};
use crate::services::login_throttle::LoginThrottle;
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 6;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials or session
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Username or email already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Login refused until older failures leave the window
    #[error("Too many failed login attempts, try again later")]
    TooManyAttempts,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for user login
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    /// Username or email
    #[serde(default, alias = "username", alias = "email")]
    pub username_or_email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginInput {
    pub fn new(username_or_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username_or_email: username_or_email.into(),
            password: password.into(),
        }
    }
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    throttle: LoginThrottle,
    session_lifetime: Duration,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_config(user_repo, session_repo, &AuthConfig::default())
    }

    /// Create a service using session lifetime and throttle limits from config
    pub fn with_config(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            throttle: LoginThrottle::from_config(config),
            session_lifetime: Duration::days(config.session_days),
        }
    }

    /// Register a new account.
    ///
    /// The first account becomes `admin`; everyone after is a plain `user`.
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_lowercase();
        validate_username(&username)?;
        validate_email(&email)?;
        validate_password(&input.password)?;

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                username
            )));
        }
        self.ensure_email_free(&email).await?;

        let role = if self.is_first_user().await? {
            UserRole::Admin
        } else {
            UserRole::User
        };

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = match self
            .user_repo
            .create(&User::new(username, email, password_hash, role))
            .await
        {
            Ok(user) => user,
            // Lost a race with a concurrent registration
            Err(err) if is_unique_violation(&err) => {
                return Err(UserServiceError::UserExists(
                    "Username or email is already registered".to_string(),
                ));
            }
            Err(err) => return Err(err.into()),
        };
        let user = self.settle_first_admin(user).await?;

        tracing::info!(user_id = user.id, role = %user.role, "Registered user {}", user.username);
        Ok(user)
    }

    /// Verify credentials and open a new session.
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let identifier = input.username_or_email.trim();
        if identifier.is_empty() || input.password.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Username/email and password are required".to_string(),
            ));
        }
        if self.throttle.is_locked(identifier).await {
            tracing::warn!("Login throttled for {}", identifier);
            return Err(UserServiceError::TooManyAttempts);
        }

        let user = match self.find_user_by_username_or_email(identifier).await? {
            Some(user) => user,
            None => {
                self.throttle.record_failure(identifier).await;
                return Err(invalid_credentials());
            }
        };

        let valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            self.throttle.record_failure(identifier).await;
            return Err(invalid_credentials());
        }

        self.throttle.clear(identifier).await;
        let session = self.create_session(user.id).await?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok((user, session))
    }

    /// Open a session for an already-authenticated user
    pub async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let session = Session::new(user_id, self.session_lifetime);
        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(created)
    }

    /// Invalidate a session. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Expired sessions are deleted and treated as absent.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {:#}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;
        Ok(user)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?
            .ok_or(UserServiceError::NotFound(id))
    }

    /// Update email, profile and preferences. Absent sections are untouched.
    pub async fn update_profile(
        &self,
        user_id: i64,
        input: UpdateProfileInput,
    ) -> Result<User, UserServiceError> {
        let mut user = self.get_by_id(user_id).await?;

        if let Some(email) = input.email {
            let email = email.trim().to_lowercase();
            if email != user.email {
                validate_email(&email)?;
                self.ensure_email_free(&email).await?;
                user.email = email;
            }
        }
        if let Some(profile) = input.profile {
            user.profile = profile;
        }
        if let Some(preferences) = input.preferences {
            user.preferences = preferences;
        }
        user.updated_at = Utc::now();

        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update user")?;
        Ok(updated)
    }

    /// Change a password after checking the current one.
    ///
    /// Every other session of the user is revoked; `keep_session` survives.
    pub async fn change_password(
        &self,
        user_id: i64,
        keep_session: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<u64, UserServiceError> {
        let mut user = self.get_by_id(user_id).await?;

        let valid = verify_password(current_password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            return Err(UserServiceError::AuthenticationError(
                "Current password is incorrect".to_string(),
            ));
        }
        validate_password(new_password)?;

        user.password_hash = hash_password(new_password).context("Failed to hash password")?;
        user.updated_at = Utc::now();
        self.user_repo
            .update(&user)
            .await
            .context("Failed to update password")?;

        let revoked = self
            .session_repo
            .delete_by_user_except(user_id, keep_session)
            .await
            .context("Failed to revoke sessions")?;
        tracing::info!(user_id, revoked, "Password changed");
        Ok(revoked)
    }

    pub async fn list_users(&self, params: &ListParams) -> Result<PagedResult<User>, UserServiceError> {
        let (users, total) = self
            .user_repo
            .list(params)
            .await
            .context("Failed to list users")?;
        Ok(PagedResult::new(users, total, params))
    }

    /// Delete an account and, through cascading keys, its sessions, tasks and posts.
    ///
    /// Admins cannot delete themselves.
    pub async fn delete_user(&self, actor: &User, id: i64) -> Result<(), UserServiceError> {
        if !actor.is_admin() {
            return Err(UserServiceError::Forbidden(
                "Only administrators can delete users".to_string(),
            ));
        }
        if actor.id == id {
            return Err(UserServiceError::ValidationError(
                "You cannot delete your own account".to_string(),
            ));
        }

        let deleted = self
            .user_repo
            .delete(id)
            .await
            .context("Failed to delete user")?;
        if !deleted {
            return Err(UserServiceError::NotFound(id));
        }
        tracing::info!(user_id = id, by = actor.id, "Deleted user");
        Ok(())
    }

    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;
        Ok(count == 0)
    }

    /// Delete expired sessions and stale throttle entries
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        self.throttle.cleanup().await;
        Ok(count)
    }

    async fn ensure_email_free(&self, email: &str) -> Result<(), UserServiceError> {
        if self
            .user_repo
            .get_by_email(email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }
        Ok(())
    }

    /// Only the lowest id keeps the admin role granted at registration.
    ///
    /// Two simultaneous first registrations both see an empty table; the
    /// later insert is demoted here.
    async fn settle_first_admin(&self, mut user: User) -> Result<User, UserServiceError> {
        if user.role != UserRole::Admin {
            return Ok(user);
        }
        let (first, _) = self
            .user_repo
            .list(&ListParams::new(1, 1))
            .await
            .context("Failed to look up first user")?;
        match first.first() {
            Some(first) if first.id != user.id => {
                tracing::warn!(user_id = user.id, "Concurrent first registration, demoting to user");
                user.role = UserRole::User;
                self.user_repo
                    .update(&user)
                    .await
                    .context("Failed to demote user")?;
                Ok(user)
            }
            _ => Ok(user),
        }
    }

    async fn find_user_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, UserServiceError> {
        if let Some(user) = self
            .user_repo
            .get_by_username(identifier)
            .await
            .context("Failed to get user by username")?
        {
            return Ok(Some(user));
        }

        // Emails are stored lowercased
        let user = self
            .user_repo
            .get_by_email(&identifier.to_lowercase())
            .await
            .context("Failed to get user by email")?;
        Ok(user)
    }
}

/// True when the error chain holds a UNIQUE constraint violation
fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db)) if db.is_unique_violation()
        )
    })
}

fn invalid_credentials() -> UserServiceError {
    UserServiceError::AuthenticationError("Invalid username or password".to_string())
}

fn validate_username(username: &str) -> Result<(), UserServiceError> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(UserServiceError::ValidationError(format!(
            "Username must be between {} and {} characters",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(UserServiceError::ValidationError(
            "Username cannot contain whitespace".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), UserServiceError> {
    if email.is_empty() {
        return Err(UserServiceError::ValidationError("Email is required".to_string()));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(UserServiceError::ValidationError("Invalid email format".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), UserServiceError> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(UserServiceError::ValidationError(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_LEN
        )));
    }
    Ok(())
}
