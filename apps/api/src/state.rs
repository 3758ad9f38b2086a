use std::sync::Arc;

use crate::activity::LoadingTracker;
use crate::attachments::AttachmentManager;
use crate::config::Config;
use crate::facade::session::Session;
use crate::facade::PersistenceFacade;
use crate::submission::SubmissionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Remote persistence. Default: `HttpFacade` against `PORTAL_API_URL`.
    pub facade: Arc<dyn PersistenceFacade>,
    /// Bearer token holder; publishes expiry when the backend answers 401.
    pub session: Arc<Session>,
    pub attachments: AttachmentManager,
    /// Live submission gates, one per (posting, person).
    pub submissions: SubmissionRegistry,
    pub loading: LoadingTracker,
    pub config: Config,
}
