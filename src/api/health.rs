//! Health endpoint
//!
//! Reports version, uptime, request counters, cache driver and whether the
//! database answers a ping. Always 200 so load balancers can read the body.

use axum::{extract::State, routing::get, Router};
use serde::Serialize;

use crate::api::middleware::AppState;
use crate::api::responses::ApiResponse;
use crate::config::DatabaseDriver;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database is unreachable
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub database: DatabaseHealth,
    pub cache_driver: &'static str,
    pub requests: RequestCounters,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub driver: DatabaseDriver,
    pub reachable: bool,
}

#[derive(Debug, Serialize)]
pub struct RequestCounters {
    pub total: u64,
    pub server_errors: u64,
    pub avg_response_time_ms: f64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

/// GET /api/health
async fn health(State(state): State<AppState>) -> ApiResponse<HealthResponse> {
    let reachable = match state.pool.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Database ping failed: {:#}", e);
            false
        }
    };
    let stats = &state.request_stats;

    ApiResponse::ok(HealthResponse {
        status: if reachable { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: stats.uptime_seconds(),
        database: DatabaseHealth {
            driver: state.pool.driver(),
            reachable,
        },
        cache_driver: state.response_cache.driver_name(),
        requests: RequestCounters {
            total: stats.total_requests(),
            server_errors: stats.server_errors(),
            avg_response_time_ms: (stats.avg_response_time_us() / 10.0).round() / 100.0,
        },
    })
}
