//! Submission fallback chain: an ordered list of (endpoint, error predicate).
//!
//! Each step calls its endpoint. On success the chain stops. On an error the
//! step's predicate decides whether the next step runs; any other error ends
//! the chain immediately. The chain knows nothing about transport, so every
//! branch is testable with plain closures.

use std::fmt;
use std::future::Future;

use tracing::{info, warn};

use crate::facade::{FacadeError, SubmissionEndpoint};

pub type ErrorPredicate = fn(&FacadeError) -> bool;

#[derive(Clone, Copy)]
pub struct FallbackStep {
    pub endpoint: SubmissionEndpoint,
    /// Errors on this step that hand over to the next one.
    pub advance_on: ErrorPredicate,
}

impl fmt::Debug for FallbackStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackStep")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct ChainSuccess<T> {
    pub value: T,
    pub endpoint: SubmissionEndpoint,
    /// Steps that failed with an advancing error before the winning one.
    pub skipped: Vec<(SubmissionEndpoint, FacadeError)>,
}

#[derive(Debug)]
pub struct ChainFailure {
    pub endpoint: SubmissionEndpoint,
    pub error: FacadeError,
    pub skipped: Vec<(SubmissionEndpoint, FacadeError)>,
}

#[derive(Debug, Clone)]
pub struct FallbackChain {
    steps: Vec<FallbackStep>,
}

fn never(_: &FacadeError) -> bool {
    false
}

impl FallbackChain {
    pub fn new(steps: Vec<FallbackStep>) -> Self {
        Self { steps }
    }

    /// update → alternate update → upsert, advancing only on
    /// "not found / method not supported".
    pub fn standard() -> Self {
        Self::new(vec![
            FallbackStep {
                endpoint: SubmissionEndpoint::Update,
                advance_on: FacadeError::is_fallback_eligible,
            },
            FallbackStep {
                endpoint: SubmissionEndpoint::AlternateUpdate,
                advance_on: FacadeError::is_fallback_eligible,
            },
            FallbackStep {
                endpoint: SubmissionEndpoint::Upsert,
                advance_on: never,
            },
        ])
    }

    pub async fn run<T, F, Fut>(&self, mut call: F) -> Result<ChainSuccess<T>, ChainFailure>
    where
        F: FnMut(SubmissionEndpoint) -> Fut,
        Fut: Future<Output = Result<T, FacadeError>>,
    {
        let mut skipped = Vec::new();
        let last = self.steps.len().saturating_sub(1);

        for (index, step) in self.steps.iter().enumerate() {
            match call(step.endpoint).await {
                Ok(value) => {
                    info!(
                        "Submission persisted via {} endpoint after {} fallback(s)",
                        step.endpoint.label(),
                        skipped.len()
                    );
                    return Ok(ChainSuccess {
                        value,
                        endpoint: step.endpoint,
                        skipped,
                    });
                }
                Err(error) if index < last && (step.advance_on)(&error) => {
                    warn!(
                        "Submission endpoint {} unavailable ({error}); falling back",
                        step.endpoint.label()
                    );
                    skipped.push((step.endpoint, error));
                }
                Err(error) => {
                    return Err(ChainFailure {
                        endpoint: step.endpoint,
                        error,
                        skipped,
                    });
                }
            }
        }

        Err(ChainFailure {
            endpoint: SubmissionEndpoint::Upsert,
            error: FacadeError::MethodNotSupported("no submission endpoint configured".to_string()),
            skipped,
        })
    }
}

impl Default for FallbackChain {
    fn default() -> Self {
        Self::standard()
    }
}
