use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One relative/affiliation row declared in annex A.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelativeDetail {
    pub full_name: String,
    pub relationship: String,
    #[serde(default)]
    pub office: Option<String>,
}

/// Annex A: "has relevant relatives/affiliations" plus its detail rows.
/// `declares_relatives` stays `None` until the candidate answers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnnexA {
    pub declares_relatives: Option<bool>,
    #[serde(default)]
    pub details: Vec<RelativeDetail>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnnexCompletionState {
    #[serde(default)]
    pub annex_a: AnnexA,
    #[serde(default)]
    pub annex_b_complete: bool,
    #[serde(default)]
    pub annex_c_complete: bool,
}

/// A knowledge/skill requirement attached to the posting and whether the
/// candidate confirmed it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeItem {
    pub requirement_id: Uuid,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub confirmed: bool,
}

/// Record created/updated when a candidate applies to a posting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSubmission {
    #[serde(default)]
    pub application_id: Option<Uuid>,
    pub posting_id: Uuid,
    pub person_id: Uuid,
    pub cv_id: Uuid,
    #[serde(default)]
    pub cv_version: i32,
    #[serde(default)]
    pub declaration_accepted: bool,
    #[serde(default)]
    pub annexes: AnnexCompletionState,
    #[serde(default)]
    pub knowledge: Vec<KnowledgeItem>,
    #[serde(default)]
    pub application_number: Option<String>,
}

/// What a submission endpoint returns on success.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    #[serde(default)]
    pub application_id: Option<Uuid>,
    #[serde(default)]
    pub application_number: Option<String>,
}

impl SubmissionReceipt {
    /// The generated application number, if present and non-blank.
    pub fn number(&self) -> Option<&str> {
        self.application_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}
