// UI-support primitives: in-flight call tracking and stale-result guards.

pub mod loading;
pub mod screen;

pub use loading::{IndicatorDelays, LoadingGuard, LoadingIndicator, LoadingTracker};
pub use screen::{ScreenContext, ScreenToken};
