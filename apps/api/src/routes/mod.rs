pub mod health;
pub mod session;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::attachments::handlers as attachments;
use crate::curriculum::handlers as curriculum;
use crate::state::AppState;
use crate::submission::handlers as submission;
use crate::tenure::handlers as tenure;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/session",
            put(session::handle_set_session).delete(session::handle_clear_session),
        )
        // Curriculum record and experience rows
        .route("/api/v1/curriculum", put(curriculum::handle_save_curriculum))
        .route(
            "/api/v1/curriculum/:person_id",
            get(curriculum::handle_get_curriculum),
        )
        .route("/api/v1/experiences", put(curriculum::handle_save_experience))
        .route(
            "/api/v1/experiences/:entry_id",
            delete(curriculum::handle_delete_experience),
        )
        // Experience tenure
        .route("/api/v1/cv/:cv_id/tenure", get(tenure::handle_get_tenure))
        // Attachments
        .route(
            "/api/v1/attachments",
            get(attachments::handle_list_attachments).post(attachments::handle_upload_attachment),
        )
        .route(
            "/api/v1/attachments/commit",
            post(attachments::handle_commit_attachments),
        )
        // Readiness and submission
        .route("/api/v1/readiness", post(submission::handle_readiness))
        .route(
            "/api/v1/applications/submit",
            post(submission::handle_submit_application),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::activity::LoadingTracker;
    use crate::attachments::{AttachmentManager, DeletePolicy, RetrievalEndpoint, UploadPolicy};
    use crate::config::Config;
    use crate::facade::session::Session;
    use crate::facade::testing::{receipt, ScriptedFacade};
    use crate::attachments::draft::tests::reference;
    use crate::facade::{FacadeError, SubmissionEndpoint};
    use crate::models::cv::{CessationReason, ExperienceEntry};
    use crate::submission::SubmissionRegistry;

    fn test_state(facade: Arc<ScriptedFacade>) -> AppState {
        let config = Config {
            portal_api_url: "https://portal.example/api".to_string(),
            file_retrieval_url: "https://portal.example/api/archivos/descargar".to_string(),
            portal_api_token: None,
            upload_max_bytes: 1024,
            upload_allowed_extensions: vec!["pdf".to_string()],
            delete_policy: DeletePolicy::LogAndContinue,
            http_timeout: Duration::from_secs(5),
            port: 0,
            rust_log: "debug".to_string(),
        };
        let retrieval = RetrievalEndpoint::new(&config.file_retrieval_url).unwrap();
        AppState {
            attachments: AttachmentManager::new(
                facade.clone(),
                UploadPolicy::default(),
                config.delete_policy,
                retrieval,
            ),
            facade,
            session: Arc::new(Session::new(Some("token".to_string()))),
            submissions: SubmissionRegistry::new(),
            loading: LoadingTracker::new(),
            config,
        }
    }

    async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(match body {
                Some(json) => Body::from(json.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn ready_application() -> Value {
        json!({
            "postingId": Uuid::new_v4(),
            "personId": Uuid::new_v4(),
            "cvId": Uuid::new_v4(),
            "cvVersion": 2,
            "declarationAccepted": true,
            "annexes": {
                "annexA": { "declaresRelatives": false },
                "annexBComplete": true,
                "annexCComplete": true
            },
            "knowledge": []
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state(Arc::new(ScriptedFacade::new())));
        let (status, body) = call(app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "hoja-vida-api");
        assert_eq!(body["session"], "active");
    }

    #[tokio::test]
    async fn test_readiness_lists_blockers() {
        let app = build_router(test_state(Arc::new(ScriptedFacade::new())));
        let (status, body) = call(app, "POST", "/api/v1/readiness", Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], false);
        assert_eq!(body["blockers"].as_array().unwrap().len(), 4);
        assert!(body.get("state").is_none());
    }

    #[tokio::test]
    async fn test_submit_through_alternate_endpoint() {
        let facade = Arc::new(ScriptedFacade::new());
        facade.script_submission(
            SubmissionEndpoint::Update,
            Err(FacadeError::NotFound("404".to_string())),
        );
        facade.script_submission(SubmissionEndpoint::AlternateUpdate, Ok(receipt("CAS-2024-001")));
        let app = build_router(test_state(facade.clone()));

        let (status, body) = call(
            app,
            "POST",
            "/api/v1/applications/submit",
            Some(ready_application()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["applicationNumber"], "CAS-2024-001");
        assert_eq!(body["state"]["state"], "submitted");
    }

    #[tokio::test]
    async fn test_submit_not_ready_is_rejected_locally() {
        let facade = Arc::new(ScriptedFacade::new());
        let app = build_router(test_state(facade.clone()));
        let mut application = ready_application();
        application["declarationAccepted"] = json!(false);

        let (status, body) =
            call(app, "POST", "/api/v1/applications/submit", Some(application)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "NOT_READY");
        assert!(facade.calls().is_empty());
    }

    #[tokio::test]
    async fn test_tenure_endpoint() {
        let facade = Arc::new(ScriptedFacade::new());
        let cv_id = Uuid::new_v4();
        facade.experiences.lock().unwrap().push(ExperienceEntry {
            id: Uuid::new_v4(),
            cv_id,
            employer: "Municipalidad".to_string(),
            position: "Asistente".to_string(),
            start_date: Some("2020-01-01".to_string()),
            end_date: Some("31/12/2020".to_string()),
            cessation_reason: CessationReason::ContractEnd,
            is_specific: false,
        });
        let app = build_router(test_state(facade));

        let uri = format!("/api/v1/cv/{cv_id}/tenure?as_of=2022-01-01");
        let (status, body) = call(app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["general"]["totalDays"], 366);
        assert_eq!(body["combined"]["years"], 1);
    }

    #[tokio::test]
    async fn test_tenure_rejects_bad_date() {
        let app = build_router(test_state(Arc::new(ScriptedFacade::new())));
        let uri = format!("/api/v1/cv/{}/tenure?as_of=someday", Uuid::new_v4());
        let (status, _) = call(app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_session_token_replaced() {
        let state = test_state(Arc::new(ScriptedFacade::new()));
        let session = state.session.clone();
        let app = build_router(state);

        let (status, _) = call(
            app,
            "PUT",
            "/api/v1/session",
            Some(json!({ "token": "fresh" })),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(session.token().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_submit_succeeds_after_session_renewed() {
        let facade = Arc::new(ScriptedFacade::new());
        facade.script_submission(SubmissionEndpoint::Update, Err(FacadeError::Unauthorized));
        facade.script_submission(SubmissionEndpoint::Update, Ok(receipt("CAS-2024-007")));
        let app = build_router(test_state(facade.clone()));
        let application = ready_application();

        let (status, body) = call(
            app.clone(),
            "POST",
            "/api/v1/applications/submit",
            Some(application.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "SESSION_EXPIRED");

        let (status, _) = call(
            app.clone(),
            "PUT",
            "/api/v1/session",
            Some(json!({ "token": "renewed" })),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) =
            call(app, "POST", "/api/v1/applications/submit", Some(application)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["applicationNumber"], "CAS-2024-007");
        assert_eq!(
            facade.calls(),
            vec!["submit:update".to_string(), "submit:update".to_string()]
        );
    }

    #[tokio::test]
    async fn test_readiness_checks_open_no_gates() {
        let app = build_router(test_state(Arc::new(ScriptedFacade::new())));
        for _ in 0..50 {
            let mut request = ready_application();
            request["declarationAccepted"] = json!(false);
            let (status, body) =
                call(app.clone(), "POST", "/api/v1/readiness", Some(request)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["state"]["state"], "incomplete");
        }

        let (_, health) = call(app, "GET", "/health", None).await;
        assert_eq!(health["openGates"], 0);
    }

    #[tokio::test]
    async fn test_tenure_defaults_to_today() {
        let facade = Arc::new(ScriptedFacade::new());
        let cv_id = Uuid::new_v4();
        facade.experiences.lock().unwrap().push(ExperienceEntry {
            id: Uuid::new_v4(),
            cv_id,
            employer: "Municipalidad".to_string(),
            position: "Asistente".to_string(),
            start_date: Some("2020-01-01".to_string()),
            end_date: Some("2020-01-31".to_string()),
            cessation_reason: CessationReason::ContractEnd,
            is_specific: true,
        });
        let app = build_router(test_state(facade));

        let (status, body) = call(app, "GET", &format!("/api/v1/cv/{cv_id}/tenure"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["specific"]["totalDays"], 31);
        assert_eq!(body["asOf"], json!(chrono::Utc::now().date_naive()));
    }

    #[tokio::test]
    async fn test_new_experience_saved_then_attachments_recorded() {
        let facade = Arc::new(ScriptedFacade::new());
        let app = build_router(test_state(facade.clone()));
        let uploaded = reference(Uuid::nil(), "constancia");

        let (status, body) = call(
            app,
            "PUT",
            "/api/v1/experiences",
            Some(json!({
                "entry": {
                    "id": Uuid::nil(),
                    "cvId": Uuid::new_v4(),
                    "startDate": "2021-03-01",
                    "endDate": null,
                    "cessationReason": "ACTUALIDAD"
                },
                "changes": [{ "action": "replace", "reference": uploaded }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let saved_id: Uuid = serde_json::from_value(body["entry"]["id"].clone()).unwrap();
        assert!(!saved_id.is_nil());
        assert_eq!(body["attachments"]["recorded"].as_array().unwrap().len(), 1);
        assert_eq!(facade.stored_references()[0].key.entity_id, saved_id);

        let calls = facade.calls();
        assert_eq!(calls[0], "upsert_experience");
        assert_eq!(calls[1], format!("upsert_file_reference:{}", uploaded.file_id));
    }

    #[tokio::test]
    async fn test_experience_rejects_foreign_reference() {
        let facade = Arc::new(ScriptedFacade::new());
        let app = build_router(test_state(facade.clone()));
        let foreign = reference(Uuid::new_v4(), "constancia");

        let (status, _) = call(
            app,
            "PUT",
            "/api/v1/experiences",
            Some(json!({
                "entry": {
                    "id": Uuid::nil(),
                    "cvId": Uuid::new_v4(),
                    "startDate": "2021-03-01",
                    "cessationReason": "ACTUALIDAD"
                },
                "changes": [{ "action": "replace", "reference": foreign }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(facade.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_experience_removes_its_references() {
        let entry_id = Uuid::new_v4();
        let attached = reference(entry_id, "constancia");
        let facade = Arc::new(ScriptedFacade::with_references(vec![attached.clone()]));
        let app = build_router(test_state(facade.clone()));

        let (status, body) =
            call(app, "DELETE", &format!("/api/v1/experiences/{entry_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], json!([attached.file_id]));
        assert!(facade.stored_references().is_empty());
        assert_eq!(facade.calls()[0], "delete_experience");
    }

    #[tokio::test]
    async fn test_curriculum_round_trip() {
        let facade = Arc::new(ScriptedFacade::new());
        let app = build_router(test_state(facade.clone()));
        let person_id = Uuid::new_v4();

        let (status, _) = call(
            app.clone(),
            "GET",
            &format!("/api/v1/curriculum/{person_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let record = json!({
            "id": Uuid::new_v4(),
            "personId": person_id,
            "state": "DRAFT",
            "version": 4
        });
        let (status, body) =
            call(app.clone(), "PUT", "/api/v1/curriculum", Some(record.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], 4);

        let (status, body) =
            call(app, "GET", &format!("/api/v1/curriculum/{person_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, record);
    }
}
