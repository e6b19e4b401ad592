//! Mood lookup endpoints (public, static data)

use axum::{routing::get, Router};

use crate::api::common::ApiPath;
use crate::api::middleware::AppState;
use crate::api::responses::{ApiError, ApiResponse};
use crate::models::Mood;
use crate::services::mood::{self, MoodInfo, MoodSuggestions, WeatherSuggestions};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_moods))
        .route("/weather/{condition}", get(weather))
        .route("/{mood}/suggestions", get(suggestions))
}

/// GET /api/moods
async fn list_moods() -> ApiResponse<&'static [MoodInfo]> {
    ApiResponse::ok(mood::all_moods())
}

/// GET /api/moods/{mood}/suggestions
async fn suggestions(
    ApiPath(raw): ApiPath<String>,
) -> Result<ApiResponse<&'static MoodSuggestions>, ApiError> {
    let mood: Mood = raw
        .parse()
        .map_err(|e: anyhow::Error| ApiError::validation_error(e.to_string()))?;
    let suggestions = mood::suggestions_for(mood)
        .ok_or_else(|| ApiError::not_found(format!("No suggestions for mood {}", mood)))?;
    Ok(ApiResponse::ok(suggestions))
}

/// GET /api/moods/weather/{condition}
async fn weather(
    ApiPath(condition): ApiPath<String>,
) -> Result<ApiResponse<&'static WeatherSuggestions>, ApiError> {
    mood::weather_suggestions(&condition)
        .map(ApiResponse::ok)
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "Unknown weather condition '{}', expected one of: {}",
                condition,
                mood::weather_conditions().join(", ")
            ))
        })
}
