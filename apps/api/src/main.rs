use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hoja_vida_api::activity::{IndicatorDelays, LoadingTracker};
use hoja_vida_api::attachments::{AttachmentManager, RetrievalEndpoint};
use hoja_vida_api::config::Config;
use hoja_vida_api::facade::session::{Session, SessionEvent};
use hoja_vida_api::facade::{HttpFacade, PersistenceFacade};
use hoja_vida_api::routes::build_router;
use hoja_vida_api::state::AppState;
use hoja_vida_api::submission::SubmissionRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting hoja-vida API v{}", env!("CARGO_PKG_VERSION"));

    // Session + portal backend
    let session = Arc::new(Session::new(config.portal_api_token.clone()));
    let facade: Arc<dyn PersistenceFacade> = Arc::new(HttpFacade::new(
        &config.portal_api_url,
        config.http_timeout,
        session.clone(),
    ));
    info!("Portal backend: {}", config.portal_api_url);

    // Attachments
    let retrieval = RetrievalEndpoint::new(&config.file_retrieval_url)?;
    let attachments = AttachmentManager::new(
        facade.clone(),
        config.upload_policy(),
        config.delete_policy,
        retrieval,
    );
    info!(
        "Attachment policy: max {} bytes, extensions {:?}, deletes {:?}",
        config.upload_max_bytes, config.upload_allowed_extensions, config.delete_policy
    );

    let loading = LoadingTracker::new();
    spawn_watchers(&session, &loading);

    // Build app state
    let state = AppState {
        facade,
        session,
        attachments,
        submissions: SubmissionRegistry::new(),
        loading,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the portal front-end

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Logs session expiry and sustained backend activity.
fn spawn_watchers(session: &Session, loading: &LoadingTracker) {
    let mut expiries = session.subscribe();
    tokio::spawn(async move {
        loop {
            match expiries.recv().await {
                Ok(SessionEvent::Expired { endpoint }) => warn!(
                    "Portal session expired ({endpoint}); waiting for a new token on /api/v1/session"
                ),
                Err(RecvError::Lagged(missed)) => debug!("Missed {missed} session event(s)"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut indicator = loading.indicator(IndicatorDelays::default());
    tokio::spawn(async move {
        while let Some(visible) = indicator.next_change().await {
            debug!("Backend activity indicator {}", if visible { "shown" } else { "hidden" });
        }
    });
}
