//! reqwest-backed Persistence Facade talking to the portal backend.
//!
//! Reads are retried on transport/5xx failures with exponential backoff.
//! Writes are sent exactly once: the backend has no idempotency key, so a
//! transport retry could create a duplicate application.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, Method};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use super::session::Session;
use super::{enveloped, normalize_list, FacadeError, PersistenceFacade, SubmissionEndpoint};
use crate::models::application::{ApplicationSubmission, SubmissionReceipt};
use crate::models::cv::{CurriculumRecord, ExperienceEntry};
use crate::models::files::{EntityType, FileReference, UploadRequest};

const MAX_READ_ATTEMPTS: u32 = 3;
const READ_BACKOFF_MS: u64 = 250;

const AUTH_PREFIX: &str = "/auth";
const CURRICULUM_PATH: &str = "/hoja-vida";
const EXPERIENCE_PATH: &str = "/experiencia";
const FILE_REFERENCE_PATH: &str = "/archivos";
const FILE_UPLOAD_PATH: &str = "/archivos/subir";
const APPLICATION_PATH: &str = "/postulacion";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    #[serde(alias = "guid", alias = "id")]
    file_id: Uuid,
}

#[derive(Clone)]
pub struct HttpFacade {
    client: Client,
    base_url: String,
    session: Arc<Session>,
}

impl HttpFacade {
    pub fn new(base_url: &str, timeout: Duration, session: Arc<Session>) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Turns a response into JSON, classifying non-success statuses.
    async fn read_body(&self, path: &str, response: reqwest::Response) -> Result<Value, FacadeError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let error = FacadeError::from_status(status.as_u16(), body);
            if expires_session(path, &error) {
                self.session.expire(path);
            }
            return Err(error);
        }
        parse_body(&body)
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, FacadeError> {
        let mut last_error: Option<FacadeError> = None;

        for attempt in 0..MAX_READ_ATTEMPTS {
            if attempt > 0 {
                let delay = Duration::from_millis(READ_BACKOFF_MS * (1 << (attempt - 1)));
                warn!(
                    "GET {path} attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let result = match self.request(Method::GET, path).query(query).send().await {
                Ok(response) => self.read_body(path, response).await,
                Err(e) => Err(FacadeError::from(e)),
            };

            match result {
                Err(e) if e.is_retryable() => last_error = Some(e),
                other => return other,
            }
        }

        Err(last_error.unwrap_or_else(|| FacadeError::Transport(format!("GET {path} failed"))))
    }

    async fn write(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, FacadeError> {
        debug!("{method} {path}");
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        let response = builder.send().await?;
        self.read_body(path, response).await
    }

    /// Writes answer with the stored object, sometimes wrapped in an array.
    fn first<T: serde::de::DeserializeOwned>(path: &str, body: Value) -> Result<T, FacadeError> {
        normalize_list::<T>(body)?
            .into_iter()
            .next()
            .ok_or_else(|| FacadeError::Decode(format!("{path} returned an empty body")))
    }
}

/// A 401 from anything but the authentication endpoints ends the session.
fn expires_session(path: &str, error: &FacadeError) -> bool {
    error.is_unauthorized() && !path.starts_with(AUTH_PREFIX)
}

/// Blank success bodies read as `null`.
fn parse_body(body: &str) -> Result<Value, FacadeError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(body)?)
}

/// Some submission endpoints answer 200 with no body; the caller then reads the
/// application back for its number.
fn receipt_from(path: &str, body: Value) -> Result<SubmissionReceipt, FacadeError> {
    if body.is_null() {
        return Ok(SubmissionReceipt {
            application_id: None,
            application_number: None,
        });
    }
    HttpFacade::first(path, body)
}

fn submission_route(endpoint: SubmissionEndpoint) -> (Method, String) {
    match endpoint {
        SubmissionEndpoint::Update => (Method::PUT, format!("{APPLICATION_PATH}/actualizar")),
        SubmissionEndpoint::AlternateUpdate => (
            Method::POST,
            format!("{APPLICATION_PATH}/actualizar-postulacion"),
        ),
        SubmissionEndpoint::Upsert => (Method::POST, format!("{APPLICATION_PATH}/registrar")),
    }
}

#[async_trait]
impl PersistenceFacade for HttpFacade {
    async fn fetch_curriculum(
        &self,
        person_id: Uuid,
    ) -> Result<Option<CurriculumRecord>, FacadeError> {
        let body = self
            .get(CURRICULUM_PATH, &[("personaId", person_id.to_string())])
            .await?;
        Ok(normalize_list::<CurriculumRecord>(body)?.into_iter().next())
    }

    async fn upsert_curriculum(
        &self,
        record: &CurriculumRecord,
    ) -> Result<CurriculumRecord, FacadeError> {
        let payload = enveloped("hojaVida", record)?;
        let body = self.write(Method::POST, CURRICULUM_PATH, Some(payload)).await?;
        Self::first(CURRICULUM_PATH, body)
    }

    async fn list_experiences(&self, cv_id: Uuid) -> Result<Vec<ExperienceEntry>, FacadeError> {
        let body = self
            .get(EXPERIENCE_PATH, &[("hojaVidaId", cv_id.to_string())])
            .await?;
        normalize_list(body)
    }

    async fn upsert_experience(
        &self,
        entry: &ExperienceEntry,
    ) -> Result<ExperienceEntry, FacadeError> {
        let payload = enveloped("experiencia", entry)?;
        let body = self.write(Method::POST, EXPERIENCE_PATH, Some(payload)).await?;
        Self::first(EXPERIENCE_PATH, body)
    }

    async fn delete_experience(&self, entry_id: Uuid) -> Result<(), FacadeError> {
        let path = format!("{EXPERIENCE_PATH}/{entry_id}");
        self.write(Method::DELETE, &path, None).await.map(|_| ())
    }

    async fn list_file_references(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<Vec<FileReference>, FacadeError> {
        let body = self
            .get(
                FILE_REFERENCE_PATH,
                &[
                    ("tipoEntidad", entity_type.as_str().to_string()),
                    ("entidadId", entity_id.to_string()),
                ],
            )
            .await?;
        normalize_list(body)
    }

    async fn upsert_file_reference(
        &self,
        reference: &FileReference,
    ) -> Result<FileReference, FacadeError> {
        let payload = enveloped("archivo", reference)?;
        let path = format!("{FILE_REFERENCE_PATH}/referencia");
        let body = self.write(Method::POST, &path, Some(payload)).await?;
        Self::first(&path, body)
    }

    async fn delete_file_reference(&self, file_id: Uuid) -> Result<(), FacadeError> {
        let path = format!("{FILE_REFERENCE_PATH}/{file_id}");
        self.write(Method::DELETE, &path, None).await.map(|_| ())
    }

    async fn upload_file(&self, request: UploadRequest) -> Result<Uuid, FacadeError> {
        let UploadRequest {
            key,
            metadata,
            extension,
            bytes,
        } = request;
        let size = bytes.len();
        let content_type = metadata
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let part = multipart::Part::bytes(bytes.to_vec())
            .file_name(metadata.original_name.clone())
            .mime_str(&content_type)
            .map_err(|e| FacadeError::Validation(format!("invalid content type: {e}")))?;

        let form = multipart::Form::new()
            .text("tipoEntidad", key.entity_type.as_str())
            .text("entidadId", key.entity_id.to_string())
            .text("tipoDocumento", key.slot.as_str().to_string())
            .text("nombreOriginal", metadata.original_name)
            .text("extension", extension)
            .text("tipoContenido", content_type)
            .text("tamano", size.to_string())
            .part("archivo", part);

        debug!("Uploading {size} bytes for slot {key}");
        let response = self
            .request(Method::POST, FILE_UPLOAD_PATH)
            .multipart(form)
            .send()
            .await?;
        let body = self.read_body(FILE_UPLOAD_PATH, response).await?;
        let parsed: UploadResponse = Self::first(FILE_UPLOAD_PATH, body)?;
        Ok(parsed.file_id)
    }

    async fn fetch_application(
        &self,
        posting_id: Uuid,
        person_id: Uuid,
    ) -> Result<Option<ApplicationSubmission>, FacadeError> {
        let body = self
            .get(
                APPLICATION_PATH,
                &[
                    ("convocatoriaId", posting_id.to_string()),
                    ("personaId", person_id.to_string()),
                ],
            )
            .await?;
        Ok(normalize_list::<ApplicationSubmission>(body)?.into_iter().next())
    }

    async fn submit_application(
        &self,
        endpoint: SubmissionEndpoint,
        submission: &ApplicationSubmission,
    ) -> Result<SubmissionReceipt, FacadeError> {
        let (method, path) = submission_route(endpoint);
        let payload = enveloped("postulacion", submission)?;
        let body = self.write(method, &path, Some(payload)).await?;
        receipt_from(&path, body)
    }
}
