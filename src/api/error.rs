use crate::services::directory::DirectoryError;
use crate::services::image_ingest::IngestError;
use crate::services::session::SessionError;
use crate::services::user_store::UserStoreError;
use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Image ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl From<UserStoreError> for AppError {
    fn from(e: UserStoreError) -> Self {
        match e {
            UserStoreError::Database(e) => AppError::Database(e),
            UserStoreError::NotFound(id) => AppError::NotFound(format!("User {} not found", id)),
            UserStoreError::Conflict(_) => AppError::Conflict(
                "Profile was modified concurrently, please retry".to_string(),
            ),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Database(e) => AppError::Database(e),
            other => {
                tracing::debug!("Session rejected: {}", other);
                AppError::Forbidden("Forbidden".to_string())
            }
        }
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                internal()
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                internal()
            }
            AppError::Ingest(e) => {
                // The image endpoint speaks plain text
                let (status, message) = if e.is_client_error() {
                    (StatusCode::BAD_REQUEST, e.to_string())
                } else {
                    tracing::error!("Image ingest failed: {:?}", e);
                    internal()
                };
                return (
                    status,
                    [(header::CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.as_ref())],
                    message,
                )
                    .into_response();
            }
            AppError::Directory(e) => {
                tracing::error!("Directory error: {}", e);
                internal()
            }
            AppError::Anyhow(e) => {
                tracing::error!("Anyhow error: {:?}", e);
                internal()
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
