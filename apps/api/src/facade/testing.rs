//! In-memory facade for unit tests. Records every call and replays scripted
//! outcomes per endpoint.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{FacadeError, PersistenceFacade, SubmissionEndpoint};
use crate::models::application::{ApplicationSubmission, SubmissionReceipt};
use crate::models::cv::{CurriculumRecord, ExperienceEntry};
use crate::models::files::{EntityType, FileReference, UploadRequest};

#[derive(Default)]
pub struct ScriptedFacade {
    pub curriculum: Mutex<Option<CurriculumRecord>>,
    pub experiences: Mutex<Vec<ExperienceEntry>>,
    pub references: Mutex<Vec<FileReference>>,
    pub application: Mutex<Option<ApplicationSubmission>>,
    submissions: Mutex<HashMap<SubmissionEndpoint, VecDeque<Result<SubmissionReceipt, FacadeError>>>>,
    uploads: Mutex<VecDeque<Result<Uuid, FacadeError>>>,
    failing_deletes: Mutex<HashSet<Uuid>>,
    failing_reference_upsert: Mutex<Option<FacadeError>>,
    calls: Mutex<Vec<String>>,
    on_submit: Mutex<Option<Box<dyn Fn() + Send>>>,
}

impl ScriptedFacade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_references(references: Vec<FileReference>) -> Self {
        let facade = Self::default();
        *facade.references.lock().unwrap() = references;
        facade
    }

    pub fn script_submission(
        &self,
        endpoint: SubmissionEndpoint,
        outcome: Result<SubmissionReceipt, FacadeError>,
    ) {
        self.submissions
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push_back(outcome);
    }

    pub fn script_upload(&self, outcome: Result<Uuid, FacadeError>) {
        self.uploads.lock().unwrap().push_back(outcome);
    }

    pub fn fail_delete_of(&self, file_id: Uuid) {
        self.failing_deletes.lock().unwrap().insert(file_id);
    }

    pub fn fail_reference_upsert(&self, error: FacadeError) {
        *self.failing_reference_upsert.lock().unwrap() = Some(error);
    }

    /// Runs `hook` inside every submission call, before its outcome is returned.
    pub fn on_submit(&self, hook: impl Fn() + Send + 'static) {
        *self.on_submit.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stored_references(&self) -> Vec<FileReference> {
        self.references.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

pub fn receipt(number: &str) -> SubmissionReceipt {
    SubmissionReceipt {
        application_id: Some(Uuid::new_v4()),
        application_number: Some(number.to_string()),
    }
}

#[async_trait]
impl PersistenceFacade for ScriptedFacade {
    async fn fetch_curriculum(
        &self,
        _person_id: Uuid,
    ) -> Result<Option<CurriculumRecord>, FacadeError> {
        self.record("fetch_curriculum");
        Ok(self.curriculum.lock().unwrap().clone())
    }

    async fn upsert_curriculum(
        &self,
        record: &CurriculumRecord,
    ) -> Result<CurriculumRecord, FacadeError> {
        self.record("upsert_curriculum");
        *self.curriculum.lock().unwrap() = Some(record.clone());
        Ok(record.clone())
    }

    async fn list_experiences(&self, cv_id: Uuid) -> Result<Vec<ExperienceEntry>, FacadeError> {
        self.record("list_experiences");
        Ok(self
            .experiences
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.cv_id == cv_id)
            .cloned()
            .collect())
    }

    async fn upsert_experience(
        &self,
        entry: &ExperienceEntry,
    ) -> Result<ExperienceEntry, FacadeError> {
        self.record("upsert_experience");
        let mut stored = entry.clone();
        if stored.id.is_nil() {
            stored.id = Uuid::new_v4();
        }
        let mut rows = self.experiences.lock().unwrap();
        rows.retain(|e| e.id != stored.id);
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn delete_experience(&self, entry_id: Uuid) -> Result<(), FacadeError> {
        self.record("delete_experience");
        self.experiences.lock().unwrap().retain(|e| e.id != entry_id);
        Ok(())
    }

    async fn list_file_references(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<Vec<FileReference>, FacadeError> {
        self.record("list_file_references");
        Ok(self
            .references
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.key.entity_type == entity_type && r.key.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn upsert_file_reference(
        &self,
        reference: &FileReference,
    ) -> Result<FileReference, FacadeError> {
        self.record(format!("upsert_file_reference:{}", reference.file_id));
        if let Some(error) = self.failing_reference_upsert.lock().unwrap().clone() {
            return Err(error);
        }
        let mut rows = self.references.lock().unwrap();
        rows.retain(|r| r.file_id != reference.file_id);
        rows.push(reference.clone());
        Ok(reference.clone())
    }

    async fn delete_file_reference(&self, file_id: Uuid) -> Result<(), FacadeError> {
        self.record(format!("delete_file_reference:{file_id}"));
        if self.failing_deletes.lock().unwrap().contains(&file_id) {
            return Err(FacadeError::Transport("storage unavailable".to_string()));
        }
        self.references
            .lock()
            .unwrap()
            .retain(|r| r.file_id != file_id);
        Ok(())
    }

    async fn upload_file(&self, request: UploadRequest) -> Result<Uuid, FacadeError> {
        self.record(format!("upload_file:{}", request.key));
        self.uploads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Uuid::new_v4()))
    }

    async fn fetch_application(
        &self,
        _posting_id: Uuid,
        _person_id: Uuid,
    ) -> Result<Option<ApplicationSubmission>, FacadeError> {
        self.record("fetch_application");
        Ok(self.application.lock().unwrap().clone())
    }

    async fn submit_application(
        &self,
        endpoint: SubmissionEndpoint,
        _submission: &ApplicationSubmission,
    ) -> Result<SubmissionReceipt, FacadeError> {
        self.record(format!("submit:{}", endpoint.label()));
        if let Some(hook) = self.on_submit.lock().unwrap().as_ref() {
            hook();
        }
        self.submissions
            .lock()
            .unwrap()
            .get_mut(&endpoint)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Err(FacadeError::NotFound("unscripted endpoint".to_string())))
    }
}
