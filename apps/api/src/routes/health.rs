use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status plus session, in-flight call and open gate counts.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "hoja-vida-api",
        "session": if state.session.token().is_some() { "active" } else { "anonymous" },
        "inFlight": state.loading.in_flight(),
        "openGates": state.submissions.open_gates().await,
    }))
}
