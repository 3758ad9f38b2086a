//! Axum route handlers for the readiness gate and application submission.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::ApplicationSubmission;
use crate::state::AppState;
use crate::submission::gate::{readiness_report, ReadinessInputs, ReadinessReport};
use crate::submission::machine::SubmissionState;
use crate::submission::registry::ApplicationKey;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessRequest {
    /// When both ids are given, the application's live gate is refreshed too.
    pub posting_id: Option<Uuid>,
    pub person_id: Option<Uuid>,
    #[serde(flatten)]
    pub inputs: ReadinessInputs,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessResponse {
    #[serde(flatten)]
    pub report: ReadinessReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<SubmissionState>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub application_number: String,
    pub state: SubmissionState,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/readiness
/// Evaluates the gate locally. Never calls the backend.
pub async fn handle_readiness(
    State(state): State<AppState>,
    Json(req): Json<ReadinessRequest>,
) -> Json<ReadinessResponse> {
    let report = readiness_report(&req.inputs);

    let gate_state = match (req.posting_id, req.person_id) {
        (Some(posting_id), Some(person_id)) => {
            let key = ApplicationKey {
                posting_id,
                person_id,
            };
            Some(state.submissions.refresh(key, &req.inputs).await)
        }
        _ => None,
    };

    Json(ReadinessResponse {
        report,
        state: gate_state,
    })
}

/// POST /api/v1/applications/submit
pub async fn handle_submit_application(
    State(state): State<AppState>,
    Json(submission): Json<ApplicationSubmission>,
) -> Result<Json<SubmitResponse>, AppError> {
    info!(
        "Submit requested for posting {} by person {}",
        submission.posting_id, submission.person_id
    );

    let _loading = state.loading.begin();
    let (application_number, gate_state) = state
        .submissions
        .submit(state.facade.as_ref(), &submission)
        .await?;

    Ok(Json(SubmitResponse {
        application_number,
        state: gate_state,
    }))
}
