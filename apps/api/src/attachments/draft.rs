use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::models::files::{DocumentSlot, EntityType, FileReference, SlotKey};

/// A change to one slot that only reaches the backend when the owning form commits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "reference", rename_all = "snake_case")]
pub enum StagedChange {
    /// A freshly uploaded file supersedes whatever the slot holds.
    Replace(FileReference),
    /// The user removed the attachment; the stored reference is deleted on commit.
    Remove,
}

/// Local slot state of one owning record's attachments.
///
/// Holds the references the backend considers authoritative (`stored`) and the
/// uncommitted changes on top of them (`staged`). Dropping or `discard`ing a
/// draft without committing leaves the backend untouched.
#[derive(Debug, Clone)]
pub struct AttachmentDraft {
    entity_type: EntityType,
    entity_id: Uuid,
    stored: BTreeMap<DocumentSlot, FileReference>,
    staged: BTreeMap<DocumentSlot, StagedChange>,
    /// Rows that lost the at-most-one race or whose delete failed; deleted on commit.
    stale: Vec<FileReference>,
}

impl AttachmentDraft {
    /// Draft for an owner with nothing stored yet.
    pub fn new(entity_type: EntityType, entity_id: Uuid) -> Self {
        Self {
            entity_type,
            entity_id,
            stored: BTreeMap::new(),
            staged: BTreeMap::new(),
            stale: Vec::new(),
        }
    }

    /// Builds a draft from the rows the facade listed for this owner.
    ///
    /// When several rows share a slot, the last one listed wins and the rest are
    /// staged for deletion.
    pub fn from_stored(
        entity_type: EntityType,
        entity_id: Uuid,
        references: Vec<FileReference>,
    ) -> Self {
        let mut draft = Self::new(entity_type, entity_id);
        for reference in references {
            if reference.key.entity_type != entity_type || reference.key.entity_id != entity_id {
                warn!(
                    "Ignoring reference {} listed for another owner ({})",
                    reference.file_id, reference.key
                );
                continue;
            }
            if let Some(previous) = draft.stored.insert(reference.key.slot.clone(), reference) {
                warn!(
                    "Duplicate reference {} in slot {}; scheduling removal",
                    previous.file_id, previous.key
                );
                draft.stale.push(previous);
            }
        }
        draft
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn entity_id(&self) -> Uuid {
        self.entity_id
    }

    pub fn key(&self, slot: &DocumentSlot) -> SlotKey {
        SlotKey {
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            slot: slot.clone(),
        }
    }

    /// The single reference the UI should show for `slot`, staged changes included.
    pub fn active(&self, slot: &DocumentSlot) -> Option<&FileReference> {
        match self.staged.get(slot) {
            Some(StagedChange::Replace(reference)) => Some(reference),
            Some(StagedChange::Remove) => None,
            None => self.stored.get(slot),
        }
    }

    pub fn active_references(&self) -> Vec<&FileReference> {
        let mut slots: Vec<&DocumentSlot> = self.stored.keys().chain(self.staged.keys()).collect();
        slots.sort();
        slots.dedup();
        slots.into_iter().filter_map(|slot| self.active(slot)).collect()
    }

    pub fn stored(&self, slot: &DocumentSlot) -> Option<&FileReference> {
        self.stored.get(slot)
    }

    pub fn staged_change(&self, slot: &DocumentSlot) -> Option<&StagedChange> {
        self.staged.get(slot)
    }

    pub fn stale(&self) -> &[FileReference] {
        &self.stale
    }

    pub fn is_dirty(&self) -> bool {
        !self.staged.is_empty() || !self.stale.is_empty()
    }

    /// Stages a confirmed upload. Only called once the upload succeeded.
    pub fn stage_replace(&mut self, reference: FileReference) {
        let slot = reference.key.slot.clone();
        self.staged.insert(slot, StagedChange::Replace(reference));
    }

    /// Marks `slot` as pending removal. Returns whether anything changed.
    ///
    /// Removing an uncommitted upload on an empty slot just drops the staged
    /// upload; there is nothing stored to delete.
    pub fn stage_remove(&mut self, slot: &DocumentSlot) -> bool {
        if self.stored.contains_key(slot) {
            self.staged.insert(slot.clone(), StagedChange::Remove) != Some(StagedChange::Remove)
        } else {
            self.staged.remove(slot).is_some()
        }
    }

    /// Forgets every staged change (user navigated away without saving).
    pub fn discard(&mut self) {
        self.staged.clear();
    }

    /// Points the draft at a new owner id, e.g. once a new record got its id
    /// from its first save. Staged uploads are re-keyed; stored rows are not
    /// touched since a new owner has none.
    pub fn bind_owner(&mut self, entity_id: Uuid) {
        if entity_id == self.entity_id {
            return;
        }
        self.entity_id = entity_id;
        for change in self.staged.values_mut() {
            if let StagedChange::Replace(reference) = change {
                reference.key.entity_id = entity_id;
            }
        }
    }

    pub(crate) fn take_staged(&mut self) -> BTreeMap<DocumentSlot, StagedChange> {
        std::mem::take(&mut self.staged)
    }

    pub(crate) fn restore_staged(&mut self, staged: BTreeMap<DocumentSlot, StagedChange>) {
        for (slot, change) in staged {
            self.staged.entry(slot).or_insert(change);
        }
    }

    pub(crate) fn take_stale(&mut self) -> Vec<FileReference> {
        std::mem::take(&mut self.stale)
    }

    pub(crate) fn push_stale(&mut self, reference: FileReference) {
        self.stale.push(reference);
    }

    pub(crate) fn set_stored(&mut self, reference: FileReference) -> Option<FileReference> {
        self.stored.insert(reference.key.slot.clone(), reference)
    }

    pub(crate) fn clear_stored(&mut self, slot: &DocumentSlot) -> Option<FileReference> {
        self.stored.remove(slot)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn reference(entity_id: Uuid, slot: &str) -> FileReference {
        FileReference {
            file_id: Uuid::new_v4(),
            key: SlotKey {
                entity_type: EntityType::Experience,
                entity_id,
                slot: DocumentSlot::new(slot),
            },
            original_name: format!("{slot}.pdf"),
            extension: "pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            size_bytes: 1024,
        }
    }

    #[test]
    fn test_duplicates_keep_last_and_mark_stale() {
        let owner = Uuid::new_v4();
        let first = reference(owner, "constancia");
        let second = reference(owner, "constancia");
        let draft = AttachmentDraft::from_stored(
            EntityType::Experience,
            owner,
            vec![first.clone(), second.clone()],
        );

        let slot = DocumentSlot::new("constancia");
        assert_eq!(draft.active(&slot), Some(&second));
        assert_eq!(draft.stale(), &[first]);
        assert_eq!(draft.active_references().len(), 1);
    }

    #[test]
    fn test_foreign_rows_are_ignored() {
        let owner = Uuid::new_v4();
        let draft = AttachmentDraft::from_stored(
            EntityType::Experience,
            owner,
            vec![reference(Uuid::new_v4(), "constancia")],
        );
        assert!(draft.active_references().is_empty());
    }

    #[test]
    fn test_staged_replace_shadows_stored() {
        let owner = Uuid::new_v4();
        let old = reference(owner, "constancia");
        let mut draft = AttachmentDraft::from_stored(EntityType::Experience, owner, vec![old.clone()]);
        let new = reference(owner, "constancia");
        draft.stage_replace(new.clone());

        let slot = DocumentSlot::new("constancia");
        assert_eq!(draft.active(&slot), Some(&new));
        assert_eq!(draft.stored(&slot), Some(&old));
        assert!(draft.is_dirty());
    }

    #[test]
    fn test_remove_of_stored_is_staged_not_applied() {
        let owner = Uuid::new_v4();
        let old = reference(owner, "constancia");
        let mut draft = AttachmentDraft::from_stored(EntityType::Experience, owner, vec![old.clone()]);
        let slot = DocumentSlot::new("constancia");

        assert!(draft.stage_remove(&slot));
        assert!(!draft.stage_remove(&slot));
        assert_eq!(draft.active(&slot), None);
        assert_eq!(draft.stored(&slot), Some(&old));

        draft.discard();
        assert_eq!(draft.active(&slot), Some(&old));
        assert!(!draft.is_dirty());
    }

    #[test]
    fn test_remove_of_unsaved_upload_just_drops_it() {
        let owner = Uuid::new_v4();
        let mut draft = AttachmentDraft::new(EntityType::Experience, owner);
        draft.stage_replace(reference(owner, "certificado"));
        let slot = DocumentSlot::new("certificado");

        assert!(draft.stage_remove(&slot));
        assert_eq!(draft.staged_change(&slot), None);
        assert!(!draft.is_dirty());
    }

    #[test]
    fn test_bind_owner_rekeys_staged_uploads() {
        let placeholder = Uuid::nil();
        let mut draft = AttachmentDraft::new(EntityType::Experience, placeholder);
        draft.stage_replace(reference(placeholder, "certificado"));

        let real = Uuid::new_v4();
        draft.bind_owner(real);

        let slot = DocumentSlot::new("certificado");
        assert_eq!(draft.active(&slot).unwrap().key.entity_id, real);
        assert_eq!(draft.key(&slot).entity_id, real);
    }
}
