//! Persistence Facade: the boundary between the CV core and the portal backend.
//!
//! Every remote read/write the core performs goes through `PersistenceFacade`.
//! Business conditions come back as values; only transport-level and HTTP-status
//! failures become `FacadeError`s.
//!
//! `AppState` carries an `Arc<dyn PersistenceFacade>`; `HttpFacade` is the
//! production backend.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::application::{ApplicationSubmission, SubmissionReceipt};
use crate::models::cv::{CurriculumRecord, ExperienceEntry};
use crate::models::files::{EntityType, FileReference, UploadRequest};

pub mod http;
pub mod session;
#[cfg(test)]
pub mod testing;

pub use http::HttpFacade;

// ────────────────────────────────────────────────────────────────────────────
// Error taxonomy
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FacadeError {
    /// Backend rejected the payload (400/422).
    #[error("validation rejected by backend: {0}")]
    Validation(String),

    /// Network failure or 5xx. Safe to retry later; local drafts are untouched.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("endpoint not found: {0}")]
    NotFound(String),

    #[error("method not supported: {0}")]
    MethodNotSupported(String),

    /// Session expired or token rejected. Fatal for any in-flight operation.
    #[error("unauthorized")]
    Unauthorized,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl FacadeError {
    /// Maps an HTTP status plus body text onto the taxonomy.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 | 422 => FacadeError::Validation(message),
            401 => FacadeError::Unauthorized,
            404 => FacadeError::NotFound(message),
            405 | 501 => FacadeError::MethodNotSupported(message),
            s if s >= 500 => FacadeError::Transport(format!("status {s}: {message}")),
            _ => FacadeError::Api { status, message },
        }
    }

    /// "Not found / method not supported" class: the submission fallback chain
    /// moves to its next endpoint on these.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self,
            FacadeError::NotFound(_) | FacadeError::MethodNotSupported(_)
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, FacadeError::Transport(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FacadeError::Unauthorized)
    }
}

impl From<reqwest::Error> for FacadeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FacadeError::Decode(err.to_string())
        } else {
            FacadeError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FacadeError {
    fn from(err: serde_json::Error) -> Self {
        FacadeError::Decode(err.to_string())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Submission endpoints
// ────────────────────────────────────────────────────────────────────────────

/// The three near-identical endpoints an application can be persisted through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionEndpoint {
    /// Canonical "update application".
    Update,
    /// Alternate update route some backend deployments expose instead.
    AlternateUpdate,
    /// Upsert/"create" route, the last resort.
    Upsert,
}

impl SubmissionEndpoint {
    pub fn label(&self) -> &'static str {
        match self {
            SubmissionEndpoint::Update => "update",
            SubmissionEndpoint::AlternateUpdate => "alternate_update",
            SubmissionEndpoint::Upsert => "upsert",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Remote persistence for CV records, attachments and applications.
///
/// List operations always return a (possibly empty) `Vec`, whatever shape the
/// backend answered with.
#[async_trait]
pub trait PersistenceFacade: Send + Sync {
    async fn fetch_curriculum(
        &self,
        person_id: Uuid,
    ) -> Result<Option<CurriculumRecord>, FacadeError>;

    async fn upsert_curriculum(
        &self,
        record: &CurriculumRecord,
    ) -> Result<CurriculumRecord, FacadeError>;

    async fn list_experiences(&self, cv_id: Uuid) -> Result<Vec<ExperienceEntry>, FacadeError>;

    async fn upsert_experience(
        &self,
        entry: &ExperienceEntry,
    ) -> Result<ExperienceEntry, FacadeError>;

    async fn delete_experience(&self, entry_id: Uuid) -> Result<(), FacadeError>;

    async fn list_file_references(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<Vec<FileReference>, FacadeError>;

    async fn upsert_file_reference(
        &self,
        reference: &FileReference,
    ) -> Result<FileReference, FacadeError>;

    async fn delete_file_reference(&self, file_id: Uuid) -> Result<(), FacadeError>;

    /// Multipart upload; returns the storage GUID of the new content.
    async fn upload_file(&self, request: UploadRequest) -> Result<Uuid, FacadeError>;

    async fn fetch_application(
        &self,
        posting_id: Uuid,
        person_id: Uuid,
    ) -> Result<Option<ApplicationSubmission>, FacadeError>;

    async fn submit_application(
        &self,
        endpoint: SubmissionEndpoint,
        submission: &ApplicationSubmission,
    ) -> Result<SubmissionReceipt, FacadeError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire helpers
// ────────────────────────────────────────────────────────────────────────────

/// Wraps a write payload as `{ "<key>": { ...fields } }`.
pub fn enveloped<T: Serialize>(key: &str, payload: &T) -> Result<Value, FacadeError> {
    let mut envelope = serde_json::Map::with_capacity(1);
    envelope.insert(key.to_string(), serde_json::to_value(payload)?);
    Ok(Value::Object(envelope))
}

/// Read endpoints answer with a single object, an array, or nothing at all.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Normalizes any read body to "array, possibly empty".
pub fn normalize_list<T: DeserializeOwned>(body: Value) -> Result<Vec<T>, FacadeError> {
    if body.is_null() {
        return Ok(Vec::new());
    }
    let parsed: OneOrMany<T> = serde_json::from_value(body)?;
    Ok(parsed.into_vec())
}
