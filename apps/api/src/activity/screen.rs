use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

/// Generation counter for one screen (or any owner of async loads).
///
/// Every load takes a `ScreenToken` before awaiting; after the await, state is
/// committed only if the token still matches. `teardown` bumps the generation,
/// so results that arrive for a torn-down screen are discarded.
#[derive(Debug, Clone, Default)]
pub struct ScreenContext {
    generation: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenToken {
    generation: u64,
}

impl ScreenContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> ScreenToken {
        ScreenToken {
            generation: self.generation.load(Ordering::Acquire),
        }
    }

    pub fn is_active(&self, token: ScreenToken) -> bool {
        self.generation.load(Ordering::Acquire) == token.generation
    }

    /// Invalidates every token handed out so far.
    pub fn teardown(&self) {
        let previous = self.generation.fetch_add(1, Ordering::AcqRel);
        debug!("Screen context torn down at generation {previous}");
    }

    /// Awaits `fut` and yields its output only if the screen is still active.
    pub async fn guarded<F: Future>(&self, fut: F) -> Option<F::Output> {
        let token = self.token();
        let output = fut.await;
        if self.is_active(token) {
            Some(output)
        } else {
            debug!("Discarding result that arrived after teardown");
            None
        }
    }
}
