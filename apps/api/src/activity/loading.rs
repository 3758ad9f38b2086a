use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep, timeout, Instant};

/// Counts in-flight remote calls and broadcasts the count to subscribers.
///
/// Starts with zero listeners and a zero count. Dropping a receiver is the
/// unsubscribe. Injected through `AppState`; there is no process-wide instance.
#[derive(Clone)]
pub struct LoadingTracker {
    count: Arc<watch::Sender<usize>>,
}

/// Marks one in-flight call; the count drops when the guard does.
#[must_use = "the call is only tracked while the guard is alive"]
pub struct LoadingGuard {
    tracker: LoadingTracker,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.tracker
            .count
            .send_modify(|count| *count = count.saturating_sub(1));
    }
}

impl LoadingTracker {
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            count: Arc::new(count),
        }
    }

    pub fn begin(&self) -> LoadingGuard {
        self.count.send_modify(|count| *count += 1);
        LoadingGuard {
            tracker: self.clone(),
        }
    }

    pub fn in_flight(&self) -> usize {
        *self.count.borrow()
    }

    pub fn listener_count(&self) -> usize {
        self.count.receiver_count()
    }

    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.count.subscribe()
    }

    pub fn indicator(&self, delays: IndicatorDelays) -> LoadingIndicator {
        LoadingIndicator {
            rx: self.subscribe(),
            delays,
            shown_at: None,
        }
    }
}

impl Default for LoadingTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IndicatorDelays {
    /// Calls finishing sooner than this never show the indicator.
    pub show_after: Duration,
    /// Once shown, stay visible at least this long.
    pub min_visible: Duration,
}

impl Default for IndicatorDelays {
    fn default() -> Self {
        Self {
            show_after: Duration::from_millis(300),
            min_visible: Duration::from_millis(500),
        }
    }
}

/// Turns the raw in-flight count into debounced show/hide transitions.
pub struct LoadingIndicator {
    rx: watch::Receiver<usize>,
    delays: IndicatorDelays,
    shown_at: Option<Instant>,
}

impl LoadingIndicator {
    pub fn is_visible(&self) -> bool {
        self.shown_at.is_some()
    }

    /// Waits for the next visibility flip: `Some(true)` on show, `Some(false)`
    /// on hide, `None` once every tracker handle is gone.
    pub async fn next_change(&mut self) -> Option<bool> {
        loop {
            let shown = self.shown_at;
            match shown {
                None => {
                    self.rx.wait_for(|count| *count > 0).await.ok()?;
                    match timeout(self.delays.show_after, self.rx.wait_for(|count| *count == 0))
                        .await
                    {
                        Ok(Ok(_)) => continue,
                        Ok(Err(_)) => return None,
                        Err(_) => {
                            self.shown_at = Some(Instant::now());
                            return Some(true);
                        }
                    }
                }
                Some(shown_at) => {
                    self.rx.wait_for(|count| *count == 0).await.ok()?;
                    let visible_for = shown_at.elapsed();
                    if visible_for < self.delays.min_visible {
                        sleep(self.delays.min_visible - visible_for).await;
                    }
                    if *self.rx.borrow_and_update() > 0 {
                        continue;
                    }
                    self.shown_at = None;
                    return Some(false);
                }
            }
        }
    }
}
