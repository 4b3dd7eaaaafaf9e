use crate::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when a dependency check fails
    pub status: String,
    pub database: String,
    /// Whether uploaded profile images can currently be stored
    pub image_storage: String,
    pub max_image_width: u32,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Database reachable and image storage writable", body = HealthResponse),
        (status = 503, description = "A dependency check failed", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database_ok = state.db.ping().await.is_ok();

    let storage_ok = match state.images.store().check_writable().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Image storage check failed: {:#}", e);
            false
        }
    };

    let status = if database_ok && storage_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthResponse {
        status: if status.is_success() { "ok" } else { "degraded" }.to_string(),
        database: if database_ok { "connected" } else { "disconnected" }.to_string(),
        image_storage: if storage_ok { "writable" } else { "unwritable" }.to_string(),
        max_image_width: state.config.max_image_width,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status, Json(body))
}
