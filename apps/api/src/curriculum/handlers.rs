//! Axum route handlers for the curriculum record and its experience rows.

use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::attachments::handlers::{stage_changes, SlotChange};
use crate::attachments::{AttachmentDraft, CommitReport};
use crate::errors::AppError;
use crate::facade::FacadeError;
use crate::models::cv::{CurriculumRecord, ExperienceEntry};
use crate::models::files::{DocumentSlot, EntityType};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveExperienceRequest {
    /// A nil id creates the row; uploads staged for it are re-keyed to the new id.
    pub entry: ExperienceEntry,
    #[serde(default)]
    pub changes: Vec<SlotChange>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedExperience {
    pub entry: ExperienceEntry,
    pub attachments: CommitReport,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/curriculum/:person_id
pub async fn handle_get_curriculum(
    State(state): State<AppState>,
    Path(person_id): Path<Uuid>,
) -> Result<Json<CurriculumRecord>, AppError> {
    let _loading = state.loading.begin();
    let record = state
        .facade
        .fetch_curriculum(person_id)
        .await?
        .ok_or_else(|| FacadeError::NotFound(format!("No curriculum for person {person_id}")))?;
    Ok(Json(record))
}

/// PUT /api/v1/curriculum
/// The version counter is passed through untouched.
pub async fn handle_save_curriculum(
    State(state): State<AppState>,
    Json(record): Json<CurriculumRecord>,
) -> Result<Json<CurriculumRecord>, AppError> {
    let _loading = state.loading.begin();
    let saved = state.facade.upsert_curriculum(&record).await?;
    info!("Curriculum {} saved at version {}", saved.id, saved.version);
    Ok(Json(saved))
}

/// PUT /api/v1/experiences
///
/// Saves the row first. Attachment changes are committed only against the id
/// the backend returned, so a failed save leaves every stored file alone.
pub async fn handle_save_experience(
    State(state): State<AppState>,
    Json(req): Json<SaveExperienceRequest>,
) -> Result<Json<SavedExperience>, AppError> {
    let _loading = state.loading.begin();
    let mut draft = if req.entry.id.is_nil() {
        AttachmentDraft::new(EntityType::Experience, req.entry.id)
    } else {
        state
            .attachments
            .load(EntityType::Experience, req.entry.id)
            .await?
    };
    stage_changes(&state, &mut draft, req.changes)?;

    let facade = state.facade.as_ref();
    let entry = &req.entry;
    let mut stored: Option<Result<ExperienceEntry, FacadeError>> = None;
    let slot = &mut stored;
    let committed = state
        .attachments
        .save_owner_then_commit(&mut draft, move || async move {
            let outcome = facade.upsert_experience(entry).await;
            let id = outcome.as_ref().map(|saved| saved.id).map_err(|e| e.clone());
            *slot = Some(outcome);
            id
        })
        .await;

    // The backend's own status wins over the generic owner-save failure.
    let entry = stored
        .transpose()?
        .ok_or_else(|| AppError::Internal(anyhow!("experience save never ran")))?;
    let attachments = committed?;
    info!(
        "Experience {} saved; {} attachment(s) recorded, {} deleted",
        entry.id,
        attachments.recorded.len(),
        attachments.deleted.len()
    );
    Ok(Json(SavedExperience { entry, attachments }))
}

/// DELETE /api/v1/experiences/:entry_id
/// Deletes the row, then every file reference still attached to it.
pub async fn handle_delete_experience(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<CommitReport>, AppError> {
    let _loading = state.loading.begin();
    state.facade.delete_experience(entry_id).await?;

    let mut draft = state
        .attachments
        .load(EntityType::Experience, entry_id)
        .await?;
    let slots: Vec<DocumentSlot> = draft
        .active_references()
        .into_iter()
        .map(|reference| reference.key.slot.clone())
        .collect();
    for slot in &slots {
        state.attachments.detach(&mut draft, slot);
    }

    let report = state.attachments.commit(&mut draft).await?;
    info!(
        "Experience {entry_id} deleted with {} attachment(s)",
        report.deleted.len()
    );
    Ok(Json(report))
}
