use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a curriculum record. Records are never deleted, only moved between states.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CvState {
    Draft,
    Complete,
}

/// The candidate's "Hoja de Vida". One active record per person.
///
/// `version` is round-tripped on every write but the backend is not known to
/// enforce it, so two sessions editing the same record can overwrite each other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumRecord {
    pub id: Uuid,
    pub person_id: Uuid,
    pub state: CvState,
    #[serde(default)]
    pub version: i32,
}

/// Why an experience ended. Decoded from the backend's catalog codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CessationReason {
    /// The position is still held; tenure runs up to "now".
    Ongoing,
    Resignation,
    ContractEnd,
    Dismissal,
    Other(String),
}

impl CessationReason {
    pub fn code(&self) -> &str {
        match self {
            CessationReason::Ongoing => "ACTUALIDAD",
            CessationReason::Resignation => "RENUNCIA",
            CessationReason::ContractEnd => "FIN_CONTRATO",
            CessationReason::Dismissal => "DESPIDO",
            CessationReason::Other(code) => code,
        }
    }

    pub fn is_ongoing(&self) -> bool {
        matches!(self, CessationReason::Ongoing)
    }
}

impl From<String> for CessationReason {
    fn from(code: String) -> Self {
        let normalized = code.trim().to_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "ACTUALIDAD" | "HASTA_LA_ACTUALIDAD" | "EN_CURSO" | "ONGOING" => {
                CessationReason::Ongoing
            }
            "RENUNCIA" | "RESIGNATION" => CessationReason::Resignation,
            "FIN_CONTRATO" | "FIN_DE_CONTRATO" | "CONTRACT_END" => CessationReason::ContractEnd,
            "DESPIDO" | "DISMISSAL" => CessationReason::Dismissal,
            _ => CessationReason::Other(code),
        }
    }
}

impl From<CessationReason> for String {
    fn from(reason: CessationReason) -> Self {
        reason.code().to_string()
    }
}

/// One professional-experience row of a curriculum record.
///
/// Dates are kept as the raw strings the backend returns; they arrive in several
/// formats and are only interpreted by the tenure calculator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceEntry {
    pub id: Uuid,
    pub cv_id: Uuid,
    #[serde(default)]
    pub employer: String,
    #[serde(default)]
    pub position: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub cessation_reason: CessationReason,
    #[serde(default)]
    pub is_specific: bool,
}
