//! File Reference Lifecycle Manager: attach / detach / commit for evidentiary
//! documents keyed by (entity type, entity id, slot).
//!
//! Protocol:
//! 1. `attach` uploads first and stages the new reference only after the upload
//!    succeeded. A failed upload leaves the slot exactly as it was.
//! 2. `detach` never calls the backend; it stages a removal.
//! 3. `commit` runs after the owning record saved: new references are recorded,
//!    then superseded/removed ones are deleted. Recording failures abort the
//!    commit; delete failures are reported and, by default, logged and skipped.
//!
//! Operations on the same slot go through `&mut AttachmentDraft`, which
//! serializes them. Uploads for different slots can run concurrently via
//! `upload` and be staged afterwards.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::attachments::draft::{AttachmentDraft, StagedChange};
use crate::attachments::preview::{resolve_reference, ResolvedFile, RetrievalEndpoint};
use crate::facade::{FacadeError, PersistenceFacade};
use crate::models::files::{DocumentSlot, EntityType, FileMetadata, FileReference, SlotKey, UploadRequest};

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("file is empty")]
    EmptyFile,

    #[error("file is {size} bytes, limit is {max}")]
    TooLarge { size: u64, max: u64 },

    #[error("extension '{0}' is not allowed")]
    ExtensionNotAllowed(String),

    #[error("upload failed: {0}")]
    Upload(#[source] FacadeError),

    #[error("could not record reference for {key}: {source}")]
    Record {
        key: SlotKey,
        #[source]
        source: FacadeError,
    },

    #[error("{} attachment delete(s) failed", .0.len())]
    DeleteFailed(Vec<DeleteFailure>),

    #[error("owning record save failed: {0}")]
    OwnerSave(String),
}

impl AttachmentError {
    /// Local validation failures never reached the network.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AttachmentError::EmptyFile
                | AttachmentError::TooLarge { .. }
                | AttachmentError::ExtensionNotAllowed(_)
        )
    }
}

/// Size and extension limits checked before any upload.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_bytes: u64,
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
            allowed_extensions: ["pdf", "jpg", "jpeg", "png"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl UploadPolicy {
    pub fn check(&self, size: u64, extension: &str) -> Result<(), AttachmentError> {
        if size == 0 {
            return Err(AttachmentError::EmptyFile);
        }
        if size > self.max_bytes {
            return Err(AttachmentError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }
        if !self
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
        {
            return Err(AttachmentError::ExtensionNotAllowed(extension.to_string()));
        }
        Ok(())
    }
}

/// What a failed delete during commit means for the owning save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Log, keep the row queued for the next commit, and report success.
    #[default]
    LogAndContinue,
    /// Fail the commit with `AttachmentError::DeleteFailed`.
    Fatal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFailure {
    pub file_id: Uuid,
    pub slot: DocumentSlot,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReport {
    pub recorded: Vec<FileReference>,
    pub deleted: Vec<Uuid>,
    pub delete_failures: Vec<DeleteFailure>,
}

#[derive(Clone)]
pub struct AttachmentManager {
    facade: Arc<dyn PersistenceFacade>,
    policy: UploadPolicy,
    delete_policy: DeletePolicy,
    retrieval: RetrievalEndpoint,
}

impl AttachmentManager {
    pub fn new(
        facade: Arc<dyn PersistenceFacade>,
        policy: UploadPolicy,
        delete_policy: DeletePolicy,
        retrieval: RetrievalEndpoint,
    ) -> Self {
        Self {
            facade,
            policy,
            delete_policy,
            retrieval,
        }
    }

    /// Loads the stored references of one owner into a fresh draft.
    pub async fn load(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<AttachmentDraft, FacadeError> {
        let references = self
            .facade
            .list_file_references(entity_type, entity_id)
            .await?;
        Ok(AttachmentDraft::from_stored(entity_type, entity_id, references))
    }

    /// Validates and uploads; returns the reference for the new content
    /// without recording or staging it.
    pub async fn upload(
        &self,
        key: SlotKey,
        bytes: Bytes,
        metadata: FileMetadata,
    ) -> Result<FileReference, AttachmentError> {
        let extension = metadata.extension();
        let size = bytes.len() as u64;
        self.policy.check(size, &extension)?;

        let file_id = self
            .facade
            .upload_file(UploadRequest {
                key: key.clone(),
                metadata: metadata.clone(),
                extension: extension.clone(),
                bytes,
            })
            .await
            .map_err(AttachmentError::Upload)?;

        info!("Uploaded {size} bytes for {key} as {file_id}");
        Ok(FileReference {
            file_id,
            key,
            original_name: metadata.original_name,
            extension,
            content_type: metadata.content_type,
            size_bytes: size,
        })
    }

    /// Uploads into `slot` and stages the result as the slot's replacement.
    pub async fn attach(
        &self,
        draft: &mut AttachmentDraft,
        slot: DocumentSlot,
        bytes: Bytes,
        metadata: FileMetadata,
    ) -> Result<FileReference, AttachmentError> {
        let reference = self.upload(draft.key(&slot), bytes, metadata).await?;
        draft.stage_replace(reference.clone());
        Ok(reference)
    }

    /// Stages removal of `slot`; nothing is deleted until `commit`.
    pub fn detach(&self, draft: &mut AttachmentDraft, slot: &DocumentSlot) -> bool {
        draft.stage_remove(slot)
    }

    /// Applies the draft's staged changes to the backend.
    ///
    /// Call only after the owning record's own save succeeded.
    pub async fn commit(&self, draft: &mut AttachmentDraft) -> Result<CommitReport, AttachmentError> {
        let mut report = CommitReport::default();
        // Leftovers from earlier commits are taken up front so a row that fails
        // again during this pass is attempted exactly once.
        let stale = draft.take_stale();
        let mut failed = Vec::new();
        let mut pending = draft.take_staged();

        while let Some((slot, change)) = pending.pop_first() {
            match change {
                StagedChange::Replace(reference) => {
                    let recorded = match self.facade.upsert_file_reference(&reference).await {
                        Ok(recorded) => recorded,
                        Err(source) => {
                            let key = reference.key.clone();
                            pending.insert(slot, StagedChange::Replace(reference));
                            draft.restore_staged(pending);
                            for leftover in stale.into_iter().chain(failed) {
                                draft.push_stale(leftover);
                            }
                            return Err(AttachmentError::Record { key, source });
                        }
                    };
                    if let Some(previous) = draft.set_stored(recorded.clone()) {
                        if previous.file_id != recorded.file_id {
                            failed.extend(self.delete(previous, &mut report).await);
                        }
                    }
                    report.recorded.push(recorded);
                }
                StagedChange::Remove => {
                    if let Some(previous) = draft.clear_stored(&slot) {
                        failed.extend(self.delete(previous, &mut report).await);
                    }
                }
            }
        }

        for leftover in stale {
            failed.extend(self.delete(leftover, &mut report).await);
        }
        for reference in failed {
            draft.push_stale(reference);
        }

        if !report.delete_failures.is_empty() && self.delete_policy == DeletePolicy::Fatal {
            return Err(AttachmentError::DeleteFailed(report.delete_failures));
        }
        Ok(report)
    }

    /// Runs the owning record's save, then commits the draft against the id it
    /// returned. A failed save leaves every stored reference untouched.
    pub async fn save_owner_then_commit<F, Fut, E>(
        &self,
        draft: &mut AttachmentDraft,
        save: F,
    ) -> Result<CommitReport, AttachmentError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Uuid, E>>,
        E: Display,
    {
        let owner_id = save()
            .await
            .map_err(|e| AttachmentError::OwnerSave(e.to_string()))?;
        draft.bind_owner(owner_id);
        self.commit(draft).await
    }

    pub fn resolve(&self, reference: &FileReference) -> ResolvedFile {
        resolve_reference(&self.retrieval, reference)
    }

    /// Deletes one reference row. Hands the row back when the backend refused,
    /// so the caller can queue it for the next commit.
    async fn delete(
        &self,
        reference: FileReference,
        report: &mut CommitReport,
    ) -> Option<FileReference> {
        match self.facade.delete_file_reference(reference.file_id).await {
            Ok(()) => {
                info!("Deleted superseded reference {} ({})", reference.file_id, reference.key);
                report.deleted.push(reference.file_id);
                None
            }
            Err(e) => {
                warn!(
                    "Delete of {} ({}) failed, will retry on next commit: {e}",
                    reference.file_id, reference.key
                );
                report.delete_failures.push(DeleteFailure {
                    file_id: reference.file_id,
                    slot: reference.key.slot.clone(),
                    error: e.to_string(),
                });
                Some(reference)
            }
        }
    }
}
