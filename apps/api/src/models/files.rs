use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of CV sub-record that can own evidentiary documents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Curriculum,
    Formation,
    Course,
    Experience,
    Declaration,
    Application,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Curriculum => "CURRICULUM",
            EntityType::Formation => "FORMATION",
            EntityType::Course => "COURSE",
            EntityType::Experience => "EXPERIENCE",
            EntityType::Declaration => "DECLARATION",
            EntityType::Application => "APPLICATION",
        }
    }
}

/// Document-type tag inside an owning record (e.g. "CERTIFICADO", "CONSTANCIA").
/// Slot tags come from the backend catalog, so they stay open-ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct DocumentSlot(pub String);

impl DocumentSlot {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// (entity type, entity id, slot); at most one active reference per key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct SlotKey {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub slot: DocumentSlot,
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.entity_type.as_str(),
            self.entity_id,
            self.slot
        )
    }
}

/// One stored evidentiary attachment. `file_id` is the opaque GUID issued by file storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileReference {
    pub file_id: Uuid,
    #[serde(flatten)]
    pub key: SlotKey,
    pub original_name: String,
    pub extension: String,
    #[serde(default)]
    pub content_type: Option<String>,
    pub size_bytes: u64,
}

/// Descriptive fields sent alongside the raw bytes of an upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub original_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl FileMetadata {
    /// Lower-cased extension taken from the original name, without the dot.
    pub fn extension(&self) -> String {
        self.original_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.trim().to_lowercase())
            .unwrap_or_default()
    }
}

/// Multipart upload as sent to file storage.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub key: SlotKey,
    pub metadata: FileMetadata,
    pub extension: String,
    pub bytes: bytes::Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_tag_is_normalized() {
        assert_eq!(DocumentSlot::new(" certificado "), DocumentSlot::new("CERTIFICADO"));
    }

    #[test]
    fn test_extension_from_original_name() {
        let meta = FileMetadata {
            original_name: "Constancia Trabajo.PDF".to_string(),
            content_type: None,
        };
        assert_eq!(meta.extension(), "pdf");

        let no_ext = FileMetadata {
            original_name: "scan".to_string(),
            content_type: None,
        };
        assert_eq!(no_ext.extension(), "");
    }

    #[test]
    fn test_reference_flattens_slot_key() {
        let reference = FileReference {
            file_id: Uuid::nil(),
            key: SlotKey {
                entity_type: EntityType::Experience,
                entity_id: Uuid::nil(),
                slot: DocumentSlot::new("constancia"),
            },
            original_name: "a.pdf".to_string(),
            extension: "pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            size_bytes: 10,
        };
        let value = serde_json::to_value(&reference).unwrap();
        assert_eq!(value["entityType"], "EXPERIENCE");
        assert_eq!(value["slot"], "CONSTANCIA");
        let back: FileReference = serde_json::from_value(value).unwrap();
        assert_eq!(back, reference);
    }
}
