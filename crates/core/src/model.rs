//! Code suggestion data model.
//!
//! These are the domain-level types that flow from the extraction gateway into a review
//! session and on to the export sink. Wire shapes for the model provider and the HTTP
//! surface live next to the code that speaks those formats.

use serde::{Deserialize, Serialize};

/// Classification of a billing code.
///
/// The model is asked for ICD-10 and CPT codes; anything else it returns is kept verbatim
/// in [`CodeType::Other`] so reviewers can still see and reject it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CodeType {
    Icd10,
    Cpt,
    Hcpcs,
    Other(String),
}

impl CodeType {
    /// Map a free-text label onto a code type.
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "ICD-10" | "ICD10" | "ICD-10-CM" => CodeType::Icd10,
            "CPT" => CodeType::Cpt,
            "HCPCS" => CodeType::Hcpcs,
            _ => CodeType::Other(trimmed.to_string()),
        }
    }

    /// The canonical label used on the wire.
    pub fn label(&self) -> &str {
        match self {
            CodeType::Icd10 => "ICD-10",
            CodeType::Cpt => "CPT",
            CodeType::Hcpcs => "HCPCS",
            CodeType::Other(label) => label,
        }
    }
}

impl std::fmt::Display for CodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for CodeType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for CodeType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(CodeType::from_label(&s))
    }
}

/// Review status of a single suggestion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeStatus {
    Suggested,
    Accepted,
    Rejected,
}

impl CodeStatus {
    /// Accepted and rejected are terminal within a session.
    pub fn is_reviewed(self) -> bool {
        !matches!(self, CodeStatus::Suggested)
    }
}

impl std::fmt::Display for CodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CodeStatus::Suggested => "suggested",
            CodeStatus::Accepted => "accepted",
            CodeStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// A reviewer's verdict on one suggestion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReviewDecision {
    Accept,
    Reject,
}

impl ReviewDecision {
    /// The status a suggestion ends up in after this decision.
    pub fn status(self) -> CodeStatus {
        match self {
            ReviewDecision::Accept => CodeStatus::Accepted,
            ReviewDecision::Reject => CodeStatus::Rejected,
        }
    }
}

/// Coarse label for a confidence score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConfidenceBand::High => "High",
            ConfidenceBand::Medium => "Medium",
            ConfidenceBand::Low => "Low",
        };
        f.write_str(s)
    }
}

/// One proposed billing code with its review status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CodeSuggestion {
    /// The billing code literal, unique within one analysis result.
    pub code: String,

    #[serde(rename = "type")]
    pub code_type: CodeType,

    /// Human-readable, non-authoritative description.
    pub description: String,

    /// Model-reported confidence in `[0.0, 1.0]`.
    pub confidence: f64,

    pub status: CodeStatus,
}

impl CodeSuggestion {
    /// Create a fresh suggestion in the `suggested` state.
    pub fn suggested(
        code: impl Into<String>,
        code_type: CodeType,
        description: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            code: code.into(),
            code_type,
            description: description.into(),
            confidence,
            status: CodeStatus::Suggested,
        }
    }

    pub fn confidence_band(&self) -> ConfidenceBand {
        if self.confidence >= 0.8 {
            ConfidenceBand::High
        } else if self.confidence >= 0.6 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }
}

/// Validated output of one analyze request.
///
/// Immutable once built; a review session copies the codes into its own mutable state.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisResult {
    summary: String,
    codes: Vec<CodeSuggestion>,
}

impl AnalysisResult {
    pub(crate) fn new(summary: String, codes: Vec<CodeSuggestion>) -> Self {
        Self { summary, codes }
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn codes(&self) -> &[CodeSuggestion] {
        &self.codes
    }

    pub fn into_parts(self) -> (String, Vec<CodeSuggestion>) {
        (self.summary, self.codes)
    }
}
