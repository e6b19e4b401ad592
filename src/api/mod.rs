//! API layer - HTTP handlers and routing
//!
//! Everything is served under `/api`:
//! - `/auth`: registration, login, session and profile
//! - `/tasks`: mood-tagged tasks with subtasks (signed in, cached)
//! - `/blogs`: public posts, drafts for their authors (reads cached)
//! - `/moods`: static mood and weather suggestions
//! - `/health`: liveness and request counters
//! - `/admin`: user management and cache purge

pub mod admin;
pub mod auth;
pub mod blogs;
pub mod cache;
pub mod common;
pub mod health;
pub mod middleware;
pub mod moods;
pub mod responses;
pub mod tasks;

use axum::{
    extract::OriginalUri,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub use cache::{response_cache_middleware, ResponseCache, X_CACHE};
pub use middleware::{AppState, AuthenticatedUser, MaybeUser, RequestStats};
pub use responses::{ApiError, ApiResponse};

/// Build the `/api` router
///
/// `route_layer` wraps inside-out: the layer added last runs first, so
/// authentication runs before the response cache reads the user.
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let task_routes = Router::new()
        .nest("/tasks", tasks::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            response_cache_middleware,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let blog_reads = Router::new()
        .nest("/blogs", blogs::public_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            response_cache_middleware,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ));

    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/blogs", blogs::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .nest("/auth", auth::public_router())
        .nest("/moods", moods::router())
        .nest("/health", health::router())
        .merge(blog_reads)
        .merge(task_routes)
        .merge(protected_routes)
        .merge(admin_routes)
}

/// CORS for the configured origin; `*` allows any origin without credentials
fn cors_layer(origin: &str) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
    ];
    let headers = [header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE];

    if origin.trim() == "*" {
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(headers);
    }

    match origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true),
        Err(e) => {
            tracing::warn!("Invalid CORS origin '{}' ({}), cross-origin requests disabled", origin, e);
            CorsLayer::new()
        }
    }
}

/// Unmatched paths still answer with the error envelope
async fn route_not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}

async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::method_not_allowed(format!("{} is not allowed on {}", method, uri.path()))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        // Both apply to the nested routes too, so they go after `nest`
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        // Outermost so every request is counted
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state)
}
