//! Authentication API endpoints
//!
//! - POST /api/auth/register - Register and sign in
//! - POST /api/auth/login - Sign in with username or email
//! - POST /api/auth/logout - End the current session
//! - GET /api/auth/me - Current user
//! - PUT /api/auth/profile - Update email, profile, preferences
//! - PUT /api/auth/password - Change password

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::ApiJson;
use crate::api::middleware::{AppState, AuthenticatedUser};
use crate::api::responses::{ApiError, ApiResponse};
use crate::models::{CreateUserInput, Session, UpdateProfileInput, User};
use crate::services::LoginInput;

/// Signed-in user plus the session token to send back
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub expires_at: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// Routes that need no session
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Routes behind `require_auth`
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/profile", put(update_profile))
        .route("/password", put(change_password))
}

fn session_cookie(session: &Session, max_age_secs: i64) -> Result<HeaderMap, ApiError> {
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.id, max_age_secs
    );
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(ApiError::internal)?,
    );
    Ok(headers)
}

fn auth_response(state: &AppState, user: User, session: Session) -> Result<(HeaderMap, ApiResponse<AuthResponse>), ApiError> {
    let headers = session_cookie(&session, state.config.auth.session_days * 24 * 60 * 60)?;
    Ok((
        headers,
        ApiResponse::ok(AuthResponse {
            user,
            token: session.id,
            expires_at: session.expires_at.to_rfc3339(),
        }),
    ))
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateUserInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_service.register(body).await?;
    let session = state.user_service.create_session(user.id).await?;

    let (headers, body) = auth_response(&state, user, session)?;
    Ok((StatusCode::CREATED, headers, body.with_message("Registration successful")))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state.user_service.login(body).await?;
    auth_response(&state, user, session)
}

/// POST /api/auth/logout
async fn logout(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    state.user_service.logout(&auth.token).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );
    Ok((StatusCode::NO_CONTENT, headers))
}

/// GET /api/auth/me
async fn me(auth: AuthenticatedUser) -> ApiResponse<User> {
    ApiResponse::ok(auth.user)
}

/// PUT /api/auth/profile
async fn update_profile(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiJson(body): ApiJson<UpdateProfileInput>,
) -> Result<ApiResponse<User>, ApiError> {
    let user = state.user_service.update_profile(auth.user.id, body).await?;
    Ok(ApiResponse::ok(user).with_message("Profile updated"))
}

/// PUT /api/auth/password
async fn change_password(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    let revoked = state
        .user_service
        .change_password(auth.user.id, &auth.token, &body.current_password, &body.new_password)
        .await?;
    Ok(ApiResponse::message(format!(
        "Password changed, {} other session(s) signed out",
        revoked
    )))
}
