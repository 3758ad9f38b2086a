//! Submission state machine.
//!
//! `Incomplete → Ready → Submitting → Submitted | Failed`, with `Failed` going
//! back through the chain on the next submit. `Submitted` is terminal: submitting again returns the number that
//! was already issued and never touches the network.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::activity::ScreenContext;
use crate::facade::{FacadeError, PersistenceFacade, SubmissionEndpoint};
use crate::models::application::ApplicationSubmission;
use crate::submission::fallback::FallbackChain;
use crate::submission::gate::{blockers, GateBlocker, ReadinessInputs};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionState {
    Incomplete {
        blockers: Vec<GateBlocker>,
    },
    Ready,
    Submitting,
    Submitted {
        #[serde(rename = "applicationNumber")]
        application_number: String,
    },
    Failed {
        reason: String,
        /// `false` when the candidate has to sign in again first. Submitting
        /// after that re-runs the chain like any other retry.
        retryable: bool,
    },
}

impl SubmissionState {
    pub fn name(&self) -> &'static str {
        match self {
            SubmissionState::Incomplete { .. } => "incomplete",
            SubmissionState::Ready => "ready",
            SubmissionState::Submitting => "submitting",
            SubmissionState::Submitted { .. } => "submitted",
            SubmissionState::Failed { .. } => "failed",
        }
    }

    pub(crate) fn from_inputs(inputs: &ReadinessInputs) -> Self {
        let blockers = blockers(inputs);
        if blockers.is_empty() {
            SubmissionState::Ready
        } else {
            SubmissionState::Incomplete { blockers }
        }
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Local gate failure; nothing was sent.
    #[error("application is not ready to submit ({} pending item(s))", .0.len())]
    NotReady(Vec<GateBlocker>),

    #[error("a submission for this application is already in progress")]
    InFlight,

    #[error("session expired; sign in again before submitting")]
    SessionExpired,

    #[error("submission rejected by {} endpoint: {source}", .endpoint.label())]
    Rejected {
        endpoint: SubmissionEndpoint,
        #[source]
        source: FacadeError,
    },

    #[error("backend accepted the application but issued no application number")]
    MissingApplicationNumber,

    /// The owning screen was torn down while the request was in flight.
    #[error("submission result discarded: screen is no longer active")]
    Discarded,
}

/// Per-application gate. Callers hold it behind a lock; see `SubmissionRegistry`.
#[derive(Debug)]
pub struct SubmissionGate {
    state: SubmissionState,
    chain: FallbackChain,
    screen: ScreenContext,
}

impl SubmissionGate {
    pub fn new(inputs: &ReadinessInputs) -> Self {
        Self {
            state: SubmissionState::from_inputs(inputs),
            chain: FallbackChain::standard(),
            screen: ScreenContext::new(),
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn screen(&self) -> &ScreenContext {
        &self.screen
    }

    pub fn application_number(&self) -> Option<&str> {
        match &self.state {
            SubmissionState::Submitted { application_number } => Some(application_number),
            _ => None,
        }
    }

    /// Re-evaluates the gate after the candidate edits declaration, annexes or
    /// knowledge confirmations. Submitted and in-flight gates are left alone.
    pub fn refresh(&mut self, inputs: &ReadinessInputs) -> &SubmissionState {
        match self.state {
            SubmissionState::Submitted { .. } | SubmissionState::Submitting => {}
            _ => self.transition(SubmissionState::from_inputs(inputs)),
        }
        &self.state
    }

    /// Submits through the fallback chain and returns the application number.
    pub async fn submit(
        &mut self,
        facade: &dyn PersistenceFacade,
        submission: &ApplicationSubmission,
    ) -> Result<String, SubmitError> {
        match &self.state {
            SubmissionState::Submitted { application_number } => {
                info!("Application {application_number} already submitted; nothing to do");
                return Ok(application_number.clone());
            }
            SubmissionState::Submitting => {
                warn!("Previous submission attempt was abandoned mid-flight; retrying");
            }
            _ => {}
        }

        let inputs = ReadinessInputs::from(submission);
        self.transition(SubmissionState::from_inputs(&inputs));
        if let SubmissionState::Incomplete { blockers } = &self.state {
            return Err(SubmitError::NotReady(blockers.clone()));
        }

        let token = self.screen.token();
        self.transition(SubmissionState::Submitting);

        let outcome = self
            .chain
            .run(move |endpoint| facade.submit_application(endpoint, submission))
            .await;

        if !self.screen.is_active(token) {
            self.transition(SubmissionState::Ready);
            return Err(SubmitError::Discarded);
        }

        let success = match outcome {
            Ok(success) => success,
            Err(failure) => {
                let error = if failure.error.is_unauthorized() {
                    SubmitError::SessionExpired
                } else {
                    SubmitError::Rejected {
                        endpoint: failure.endpoint,
                        source: failure.error,
                    }
                };
                self.fail(&error);
                return Err(error);
            }
        };

        let number = match success.value.number() {
            Some(number) => Some(number.to_string()),
            None => {
                let recovered = self.recover_number(facade, submission).await;
                if !self.screen.is_active(token) {
                    self.transition(SubmissionState::Ready);
                    return Err(SubmitError::Discarded);
                }
                recovered
            }
        };

        match number {
            Some(application_number) => {
                info!(
                    "Application submitted as {application_number} via {} endpoint",
                    success.endpoint.label()
                );
                self.transition(SubmissionState::Submitted {
                    application_number: application_number.clone(),
                });
                Ok(application_number)
            }
            None => {
                let error = SubmitError::MissingApplicationNumber;
                self.fail(&error);
                Err(error)
            }
        }
    }

    /// Reads the application back when the endpoint answered without a number.
    async fn recover_number(
        &self,
        facade: &dyn PersistenceFacade,
        submission: &ApplicationSubmission,
    ) -> Option<String> {
        warn!("Submission receipt carried no application number; reading it back");
        match facade
            .fetch_application(submission.posting_id, submission.person_id)
            .await
        {
            Ok(stored) => stored
                .and_then(|app| app.application_number)
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            Err(e) => {
                warn!("Could not read application back: {e}");
                None
            }
        }
    }

    fn fail(&mut self, error: &SubmitError) {
        let retryable = !matches!(error, SubmitError::SessionExpired);
        self.transition(SubmissionState::Failed {
            reason: error.to_string(),
            retryable,
        });
    }

    fn transition(&mut self, next: SubmissionState) {
        if self.state != next {
            debug!("Submission state {} -> {}", self.state.name(), next.name());
        }
        self.state = next;
    }
}
