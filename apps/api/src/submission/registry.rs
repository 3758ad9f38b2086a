use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::facade::PersistenceFacade;
use crate::models::application::ApplicationSubmission;
use crate::submission::gate::ReadinessInputs;
use crate::submission::machine::{SubmissionGate, SubmissionState, SubmitError};

/// One application: a candidate against a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApplicationKey {
    pub posting_id: Uuid,
    pub person_id: Uuid,
}

impl From<&ApplicationSubmission> for ApplicationKey {
    fn from(submission: &ApplicationSubmission) -> Self {
        Self {
            posting_id: submission.posting_id,
            person_id: submission.person_id,
        }
    }
}

/// Live submission gates, one per application.
///
/// A gate is opened by a submit and kept only once it reaches `Submitted`, so a
/// repeated submit for the same application returns the number already issued.
/// Any other outcome closes it again; readiness checks never open one.
#[derive(Clone, Default)]
pub struct SubmissionRegistry {
    gates: Arc<Mutex<HashMap<ApplicationKey, Arc<Mutex<SubmissionGate>>>>>,
}

impl SubmissionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn open_gate(
        &self,
        key: ApplicationKey,
        inputs: &ReadinessInputs,
    ) -> Arc<Mutex<SubmissionGate>> {
        let mut gates = self.gates.lock().await;
        gates
            .entry(key)
            .or_insert_with(|| {
                debug!(
                    "Opening submission gate for posting {} / person {}",
                    key.posting_id, key.person_id
                );
                Arc::new(Mutex::new(SubmissionGate::new(inputs)))
            })
            .clone()
    }

    async fn close_gate(&self, key: ApplicationKey, gate: &Arc<Mutex<SubmissionGate>>) {
        let mut gates = self.gates.lock().await;
        if gates.get(&key).is_some_and(|open| Arc::ptr_eq(open, gate)) {
            gates.remove(&key);
            debug!(
                "Closed submission gate for posting {} / person {}",
                key.posting_id, key.person_id
            );
        }
    }

    /// Number of gates currently held: submitted applications plus any
    /// submission still in flight.
    pub async fn open_gates(&self) -> usize {
        self.gates.lock().await.len()
    }

    /// Evaluates readiness for the application against fresh inputs.
    ///
    /// An open gate is re-evaluated in place, so a submitted application keeps
    /// reporting `Submitted`. Returns `Submitting` without waiting when a
    /// submission holds the gate.
    pub async fn refresh(&self, key: ApplicationKey, inputs: &ReadinessInputs) -> SubmissionState {
        let Some(gate) = self.gates.lock().await.get(&key).cloned() else {
            return SubmissionState::from_inputs(inputs);
        };
        let state = match gate.try_lock() {
            Ok(mut gate) => gate.refresh(inputs).clone(),
            Err(_) => SubmissionState::Submitting,
        };
        state
    }

    /// Runs the gate for `submission`. A second submit for the same
    /// application while one is in flight fails with `InFlight`.
    pub async fn submit(
        &self,
        facade: &dyn PersistenceFacade,
        submission: &ApplicationSubmission,
    ) -> Result<(String, SubmissionState), SubmitError> {
        let key = ApplicationKey::from(submission);
        let shared = self.open_gate(key, &ReadinessInputs::from(submission)).await;
        let mut gate = shared.try_lock().map_err(|_| SubmitError::InFlight)?;

        let outcome = gate.submit(facade, submission).await;
        let state = gate.state().clone();
        if !matches!(state, SubmissionState::Submitted { .. }) {
            self.close_gate(key, &shared).await;
        }
        outcome.map(|number| (number, state))
    }
}
