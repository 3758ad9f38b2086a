use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::application::{
    AnnexA, AnnexCompletionState, ApplicationSubmission, KnowledgeItem,
};

/// Everything the gate looks at. Evaluated locally; never touches the network.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessInputs {
    #[serde(default)]
    pub declaration_accepted: bool,
    #[serde(default)]
    pub annexes: AnnexCompletionState,
    #[serde(default)]
    pub knowledge: Vec<KnowledgeItem>,
}

impl From<&ApplicationSubmission> for ReadinessInputs {
    fn from(submission: &ApplicationSubmission) -> Self {
        Self {
            declaration_accepted: submission.declaration_accepted,
            annexes: submission.annexes.clone(),
            knowledge: submission.knowledge.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Annex {
    A,
    B,
    C,
}

/// One unmet precondition for submitting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "blocker", rename_all = "snake_case")]
pub enum GateBlocker {
    DeclarationNotAccepted,
    /// Annex A was never answered.
    AnnexAUnanswered,
    /// Annex A declares relatives but lists none.
    AnnexAMissingDetails,
    AnnexIncomplete { annex: Annex },
    KnowledgeUnconfirmed { requirement_id: Uuid, label: String },
}

impl GateBlocker {
    pub fn message(&self) -> String {
        match self {
            GateBlocker::DeclarationNotAccepted => {
                "Debe aceptar la declaración jurada de veracidad".to_string()
            }
            GateBlocker::AnnexAUnanswered => "Complete el Anexo A".to_string(),
            GateBlocker::AnnexAMissingDetails => {
                "Registre al menos un familiar o vínculo en el Anexo A".to_string()
            }
            GateBlocker::AnnexIncomplete { annex } => format!("Complete el Anexo {annex:?}"),
            GateBlocker::KnowledgeUnconfirmed { label, .. } => {
                format!("Confirme el conocimiento requerido: {label}")
            }
        }
    }
}

/// Annex A is complete once answered "no", or answered "yes" with ≥1 detail row.
pub fn annex_a_blocker(annex: &AnnexA) -> Option<GateBlocker> {
    match annex.declares_relatives {
        None => Some(GateBlocker::AnnexAUnanswered),
        Some(true) if annex.details.is_empty() => Some(GateBlocker::AnnexAMissingDetails),
        Some(_) => None,
    }
}

pub fn annexes_complete(annexes: &AnnexCompletionState) -> bool {
    annex_a_blocker(&annexes.annex_a).is_none()
        && annexes.annex_b_complete
        && annexes.annex_c_complete
}

/// Vacuously true for postings without knowledge requirements.
pub fn knowledge_confirmed(knowledge: &[KnowledgeItem]) -> bool {
    knowledge.iter().all(|item| item.confirmed)
}

/// Lists every unmet precondition; empty means ready.
pub fn blockers(inputs: &ReadinessInputs) -> Vec<GateBlocker> {
    let mut blockers = Vec::new();

    if !inputs.declaration_accepted {
        blockers.push(GateBlocker::DeclarationNotAccepted);
    }
    if let Some(blocker) = annex_a_blocker(&inputs.annexes.annex_a) {
        blockers.push(blocker);
    }
    if !inputs.annexes.annex_b_complete {
        blockers.push(GateBlocker::AnnexIncomplete { annex: Annex::B });
    }
    if !inputs.annexes.annex_c_complete {
        blockers.push(GateBlocker::AnnexIncomplete { annex: Annex::C });
    }
    blockers.extend(
        inputs
            .knowledge
            .iter()
            .filter(|item| !item.confirmed)
            .map(|item| GateBlocker::KnowledgeUnconfirmed {
                requirement_id: item.requirement_id,
                label: item.label.clone(),
            }),
    );

    blockers
}

pub fn is_ready(inputs: &ReadinessInputs) -> bool {
    inputs.declaration_accepted
        && annexes_complete(&inputs.annexes)
        && knowledge_confirmed(&inputs.knowledge)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub ready: bool,
    pub blockers: Vec<GateBlocker>,
    pub messages: Vec<String>,
}

pub fn readiness_report(inputs: &ReadinessInputs) -> ReadinessReport {
    let blockers = blockers(inputs);
    ReadinessReport {
        ready: blockers.is_empty(),
        messages: blockers.iter().map(GateBlocker::message).collect(),
        blockers,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::application::RelativeDetail;

    pub(crate) fn ready_inputs() -> ReadinessInputs {
        ReadinessInputs {
            declaration_accepted: true,
            annexes: AnnexCompletionState {
                annex_a: AnnexA {
                    declares_relatives: Some(false),
                    details: vec![],
                },
                annex_b_complete: true,
                annex_c_complete: true,
            },
            knowledge: vec![KnowledgeItem {
                requirement_id: Uuid::new_v4(),
                label: "Gestión pública".to_string(),
                confirmed: true,
            }],
        }
    }

    #[test]
    fn test_all_inputs_hold_is_ready() {
        let inputs = ready_inputs();
        assert!(is_ready(&inputs));
        assert!(blockers(&inputs).is_empty());
    }

    #[test]
    fn test_flipping_any_single_input_blocks() {
        let flips: [fn(&mut ReadinessInputs); 6] = [
            |i: &mut ReadinessInputs| i.declaration_accepted = false,
            |i: &mut ReadinessInputs| i.annexes.annex_a.declares_relatives = None,
            |i: &mut ReadinessInputs| i.annexes.annex_a.declares_relatives = Some(true),
            |i: &mut ReadinessInputs| i.annexes.annex_b_complete = false,
            |i: &mut ReadinessInputs| i.annexes.annex_c_complete = false,
            |i: &mut ReadinessInputs| i.knowledge[0].confirmed = false,
        ];
        for flip in flips {
            let mut inputs = ready_inputs();
            flip(&mut inputs);
            assert!(!is_ready(&inputs), "{inputs:?}");
            assert_eq!(blockers(&inputs).len(), 1, "{inputs:?}");
        }
    }

    #[test]
    fn test_relatives_without_details_blocks_regardless() {
        let mut inputs = ready_inputs();
        inputs.annexes.annex_a.declares_relatives = Some(true);
        assert_eq!(blockers(&inputs), vec![GateBlocker::AnnexAMissingDetails]);

        inputs.annexes.annex_a.details.push(RelativeDetail {
            full_name: "María Quispe".to_string(),
            relationship: "Hermana".to_string(),
            office: None,
        });
        assert!(is_ready(&inputs));
    }

    #[test]
    fn test_no_relatives_is_complete_with_zero_rows() {
        let annex = AnnexA {
            declares_relatives: Some(false),
            details: vec![],
        };
        assert_eq!(annex_a_blocker(&annex), None);
    }

    #[test]
    fn test_empty_knowledge_list_is_vacuously_confirmed() {
        let mut inputs = ready_inputs();
        inputs.knowledge.clear();
        assert!(is_ready(&inputs));
    }

    #[test]
    fn test_report_lists_every_blocker_with_message() {
        let report = readiness_report(&ReadinessInputs::default());
        assert!(!report.ready);
        assert_eq!(
            report.blockers,
            vec![
                GateBlocker::DeclarationNotAccepted,
                GateBlocker::AnnexAUnanswered,
                GateBlocker::AnnexIncomplete { annex: Annex::B },
                GateBlocker::AnnexIncomplete { annex: Annex::C },
            ]
        );
        assert_eq!(report.messages.len(), 4);
        assert_eq!(report.messages[2], "Complete el Anexo B");
    }
}
