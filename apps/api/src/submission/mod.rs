// Submission readiness: the local gate over declaration, annexes and knowledge
// confirmations, and the state machine that persists an application through the
// endpoint fallback chain.

pub mod fallback;
pub mod gate;
pub mod handlers;
pub mod machine;
pub mod registry;

pub use fallback::{ChainFailure, ChainSuccess, FallbackChain, FallbackStep};
pub use gate::{is_ready, readiness_report, GateBlocker, ReadinessInputs, ReadinessReport};
pub use machine::{SubmissionGate, SubmissionState, SubmitError};
pub use registry::{ApplicationKey, SubmissionRegistry};
