//! Axum route handlers for evidentiary attachments.

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attachments::draft::AttachmentDraft;
use crate::attachments::manager::CommitReport;
use crate::attachments::preview::ResolvedFile;
use crate::errors::AppError;
use crate::models::files::{DocumentSlot, EntityType, FileMetadata, FileReference, SlotKey};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentView {
    pub reference: FileReference,
    pub resolved: ResolvedFile,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SlotChange {
    Replace { reference: FileReference },
    Remove { slot: DocumentSlot },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub changes: Vec<SlotChange>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/attachments?entityType=..&entityId=..
pub async fn handle_list_attachments(
    State(state): State<AppState>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<Vec<AttachmentView>>, AppError> {
    let draft = {
        let _loading = state.loading.begin();
        state
            .attachments
            .load(owner.entity_type, owner.entity_id)
            .await?
    };

    let views = draft
        .active_references()
        .into_iter()
        .map(|reference| AttachmentView {
            resolved: state.attachments.resolve(reference),
            reference: reference.clone(),
        })
        .collect();
    Ok(Json(views))
}

/// POST /api/v1/attachments (multipart: entityType, entityId, slot, file)
///
/// Uploads only. The returned reference becomes the slot's attachment when the
/// owning form commits it through `/api/v1/attachments/commit`.
pub async fn handle_upload_attachment(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<FileReference>, AppError> {
    let mut entity_type: Option<EntityType> = None;
    let mut entity_id: Option<Uuid> = None;
    let mut slot: Option<DocumentSlot> = None;
    let mut file: Option<(Bytes, FileMetadata)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let metadata = FileMetadata {
                    original_name: field.file_name().unwrap_or("archivo").to_string(),
                    content_type: field.content_type().map(str::to_string),
                };
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read file: {e}")))?;
                file = Some((bytes, metadata));
            }
            "entityType" => {
                let text = field_text(field).await?;
                entity_type = Some(
                    serde_json::from_value(serde_json::Value::String(text.clone()))
                        .map_err(|_| AppError::Validation(format!("Unknown entity type '{text}'")))?,
                );
            }
            "entityId" => {
                let text = field_text(field).await?;
                entity_id = Some(
                    Uuid::parse_str(text.trim())
                        .map_err(|_| AppError::Validation(format!("Invalid entity id '{text}'")))?,
                );
            }
            "slot" => slot = Some(DocumentSlot::new(field_text(field).await?)),
            _ => {}
        }
    }

    let key = SlotKey {
        entity_type: entity_type.ok_or_else(|| missing("entityType"))?,
        entity_id: entity_id.ok_or_else(|| missing("entityId"))?,
        slot: slot.ok_or_else(|| missing("slot"))?,
    };
    let (bytes, metadata) = file.ok_or_else(|| missing("file"))?;

    let _loading = state.loading.begin();
    let reference = state.attachments.upload(key, bytes, metadata).await?;
    Ok(Json(reference))
}

/// POST /api/v1/attachments/commit
pub async fn handle_commit_attachments(
    State(state): State<AppState>,
    Json(req): Json<CommitRequest>,
) -> Result<Json<CommitReport>, AppError> {
    let _loading = state.loading.begin();
    let mut draft = state
        .attachments
        .load(req.entity_type, req.entity_id)
        .await?;
    stage_changes(&state, &mut draft, req.changes)?;

    let report = state.attachments.commit(&mut draft).await?;
    Ok(Json(report))
}

/// Stages client-side slot changes on `draft`. References must belong to the
/// draft's owner.
pub(crate) fn stage_changes(
    state: &AppState,
    draft: &mut AttachmentDraft,
    changes: Vec<SlotChange>,
) -> Result<(), AppError> {
    for change in changes {
        match change {
            SlotChange::Replace { reference } => {
                if reference.key.entity_type != draft.entity_type()
                    || reference.key.entity_id != draft.entity_id()
                {
                    return Err(AppError::Validation(format!(
                        "Reference {} belongs to {}",
                        reference.file_id, reference.key
                    )));
                }
                draft.stage_replace(reference);
            }
            SlotChange::Remove { slot } => {
                state.attachments.detach(draft, &slot);
            }
        }
    }
    Ok(())
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Unreadable form field: {e}")))
}

fn missing(field: &str) -> AppError {
    AppError::Validation(format!("Missing multipart field '{field}'"))
}
