use axum::{Json, response::IntoResponse};
use http::StatusCode;
use serde_json::json;

/// Liveness probe; never touches the remote API or the audio store
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "music-generation",
        })),
    )
}
