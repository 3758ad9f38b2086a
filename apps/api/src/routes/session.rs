use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub token: String,
}

/// PUT /api/v1/session
/// Hands the BFF a fresh bearer token after the user signs in again.
pub async fn handle_set_session(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> Result<StatusCode, AppError> {
    let token = req.token.trim();
    if token.is_empty() {
        return Err(AppError::Validation("token must not be empty".to_string()));
    }
    state.session.set_token(Some(token.to_string()));
    info!("Session token replaced");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/session
pub async fn handle_clear_session(State(state): State<AppState>) -> StatusCode {
    state.session.set_token(None);
    info!("Session token cleared");
    StatusCode::NO_CONTENT
}
