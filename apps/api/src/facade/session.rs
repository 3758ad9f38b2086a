use std::sync::RwLock;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A non-authentication endpoint answered 401: credentials were cleared and
    /// the UI should notify the user and redirect to login.
    Expired { endpoint: String },
}

/// Stored credentials plus the session-expiry broadcast.
pub struct Session {
    token: RwLock<Option<String>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    pub fn new(token: Option<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            token: RwLock::new(token),
            events,
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Runs the global expiry flow. Authentication endpoints never reach here.
    pub fn expire(&self, endpoint: &str) {
        warn!("Session expired on {endpoint}; clearing stored credentials");
        self.set_token(None);
        // No subscribers is fine: nobody is listening for the redirect.
        let _ = self.events.send(SessionEvent::Expired {
            endpoint: endpoint.to_string(),
        });
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(None)
    }
}
