//! JSON request and response bodies for the HTTP surface.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body returned for 400 when the note is missing, not a string, or blank.
pub const NOTE_REQUIRED_ERROR: &str = "Clinical note is required and must be a non-empty string.";

/// Body returned for 500 on any downstream failure.
pub const ANALYSIS_FAILED_ERROR: &str = "Failed to process the note with the AI model.";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Request to analyse one clinical note.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeReq {
    /// Free-text clinical note, embedded verbatim in the model prompt.
    pub note: String,
}

/// One suggested code as returned to the front end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CodeRes {
    pub code: String,
    /// Code classification, e.g. `ICD-10` or `CPT`.
    #[serde(rename = "type")]
    pub code_type: String,
    pub description: String,
    pub confidence: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeRes {
    /// One-sentence summary of the visit.
    pub summary: String,
    pub codes: Vec<CodeRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

impl ErrorRes {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
