use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::attachments::AttachmentError;
use crate::facade::FacadeError;
use crate::submission::SubmitError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backend error: {0}")]
    Facade(#[from] FacadeError),

    #[error("Attachment error: {0}")]
    Attachment(#[from] AttachmentError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmitError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Status, code and client-facing message for a backend failure.
fn facade_parts(error: &FacadeError) -> (StatusCode, &'static str, String) {
    match error {
        FacadeError::Validation(msg) => (StatusCode::BAD_REQUEST, "BACKEND_VALIDATION", msg.clone()),
        FacadeError::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            "SESSION_EXPIRED",
            "Session expired; sign in again".to_string(),
        ),
        FacadeError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
        FacadeError::Transport(msg) => {
            tracing::error!("Backend transport error: {msg}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "BACKEND_UNAVAILABLE",
                "The portal backend is unavailable; try again".to_string(),
            )
        }
        other => {
            tracing::error!("Backend error: {other}");
            (
                StatusCode::BAD_GATEWAY,
                "BACKEND_ERROR",
                "The portal backend returned an unexpected response".to_string(),
            )
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Facade(e) => facade_parts(e),
            AppError::Attachment(e) => match e {
                e if e.is_validation() => {
                    (StatusCode::BAD_REQUEST, "ATTACHMENT_REJECTED", e.to_string())
                }
                AttachmentError::Upload(source) | AttachmentError::Record { source, .. } => {
                    facade_parts(source)
                }
                AttachmentError::DeleteFailed(_) => {
                    tracing::error!("Attachment commit failed: {e}");
                    (StatusCode::BAD_GATEWAY, "ATTACHMENT_DELETE_FAILED", e.to_string())
                }
                _ => (StatusCode::CONFLICT, "ATTACHMENT_ERROR", e.to_string()),
            },
            AppError::Submission(e) => match e {
                SubmitError::NotReady(blockers) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "NOT_READY",
                    blockers
                        .iter()
                        .map(|b| b.message())
                        .collect::<Vec<_>>()
                        .join("; "),
                ),
                SubmitError::InFlight | SubmitError::Discarded => {
                    (StatusCode::CONFLICT, "SUBMISSION_IN_PROGRESS", e.to_string())
                }
                SubmitError::SessionExpired => {
                    (StatusCode::UNAUTHORIZED, "SESSION_EXPIRED", e.to_string())
                }
                SubmitError::Rejected { source, .. } => facade_parts(source),
                SubmitError::MissingApplicationNumber => {
                    tracing::error!("{e}");
                    (StatusCode::BAD_GATEWAY, "MISSING_APPLICATION_NUMBER", e.to_string())
                }
            },
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
