//! Sanitising and validating raw model output.
//!
//! Model text is untrusted input. It is stripped of markdown code fences, deserialised into a
//! strict wire model (reporting the failing path via `serde_path_to_error`), then converted into
//! domain types with the remaining invariants checked. The result is either a complete
//! [`AnalysisResult`] or an [`ExtractionError::MalformedModelOutput`], never a mix.

use std::collections::HashSet;

use serde::Deserialize;

use crate::error::{ExtractionError, ExtractionResult};
use crate::model::{AnalysisResult, CodeSuggestion, CodeType};

const FENCE: &str = "```";

/// Remove a leading ```` ```json ```` (or bare ```` ``` ````) marker and a trailing ```` ``` ````.
///
/// Text without fences is returned trimmed and otherwise untouched.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix(FENCE) {
        text = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
    }
    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest;
    }

    text.trim()
}

/// Parse raw model text into a validated [`AnalysisResult`].
///
/// # Errors
///
/// Returns [`ExtractionError::MalformedModelOutput`] if:
/// - the text is not a single JSON object after fence stripping (including trailing prose),
/// - `summary` or any of `code`, `type`, `description`, `confidence` is missing or mistyped,
/// - a code literal is blank,
/// - a confidence is outside `[0.0, 1.0]`.
pub fn parse_model_output(raw: &str) -> ExtractionResult<AnalysisResult> {
    let sanitized = strip_code_fences(raw);
    if sanitized.is_empty() {
        return Err(ExtractionError::MalformedModelOutput(
            "model output is empty".into(),
        ));
    }

    let mut deserializer = serde_json::Deserializer::from_str(sanitized);
    let wire = match serde_path_to_error::deserialize::<_, AnalysisWire>(&mut deserializer) {
        Ok(parsed) => parsed,
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            return Err(ExtractionError::MalformedModelOutput(format!(
                "schema mismatch at {path}: {source}"
            )));
        }
    };
    deserializer.end().map_err(|e| {
        ExtractionError::MalformedModelOutput(format!("unexpected text after JSON object: {e}"))
    })?;

    wire_to_domain(wire)
}

// ============================================================================
// Wire types (internal)
// ============================================================================

/// Shape the model is instructed to produce. Extra keys are tolerated.
#[derive(Debug, Deserialize)]
struct AnalysisWire {
    summary: String,
    codes: Vec<CodeWire>,
}

#[derive(Debug, Deserialize)]
struct CodeWire {
    code: String,
    #[serde(rename = "type")]
    code_type: String,
    description: String,
    confidence: f64,
}

fn wire_to_domain(wire: AnalysisWire) -> ExtractionResult<AnalysisResult> {
    let mut seen = HashSet::new();
    let mut codes = Vec::with_capacity(wire.codes.len());

    for (index, entry) in wire.codes.into_iter().enumerate() {
        let code = entry.code.trim();
        if code.is_empty() {
            return Err(ExtractionError::MalformedModelOutput(format!(
                "codes[{index}].code is blank"
            )));
        }
        if !entry.confidence.is_finite() || !(0.0..=1.0).contains(&entry.confidence) {
            return Err(ExtractionError::MalformedModelOutput(format!(
                "codes[{index}].confidence {} is outside 0.0..=1.0",
                entry.confidence
            )));
        }
        if !seen.insert(code.to_string()) {
            tracing::warn!(code, index, "dropping duplicate code suggestion from model output");
            continue;
        }

        codes.push(CodeSuggestion::suggested(
            code,
            CodeType::from_label(&entry.code_type),
            entry.description.trim(),
            entry.confidence,
        ));
    }

    Ok(AnalysisResult::new(wire.summary.trim().to_string(), codes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CodeStatus;

    const VALID: &str = r#"{
  "summary": "Follow-up for type 2 diabetes and hypertension.",
  "codes": [
    {"code": "E11.9", "type": "ICD-10", "description": "Type 2 diabetes mellitus without complications", "confidence": 0.95},
    {"code": "I10", "type": "ICD-10", "description": "Essential (primary) hypertension", "confidence": 0.9},
    {"code": "93306", "type": "CPT", "description": "Echocardiography", "confidence": 0.55}
  ]
}"#;

    fn expect_malformed(raw: &str) -> String {
        match parse_model_output(raw) {
            Err(ExtractionError::MalformedModelOutput(msg)) => msg,
            other => panic!("expected MalformedModelOutput, got {other:?}"),
        }
    }

    #[test]
    fn strips_json_fences() {
        let fenced = format!("```json\n{VALID}\n```");
        assert_eq!(strip_code_fences(&fenced), VALID.trim());
    }

    #[test]
    fn strips_bare_and_uppercase_fences() {
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  ```JSON {} ```  "), "{}");
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn fenced_and_plain_output_parse_identically() {
        let plain = parse_model_output(VALID).expect("plain should parse");
        let fenced =
            parse_model_output(&format!("```json\n{VALID}\n```")).expect("fenced should parse");
        assert_eq!(plain, fenced);
    }

    #[test]
    fn parses_valid_output_as_suggested() {
        let result = parse_model_output(VALID).expect("should parse");
        assert_eq!(
            result.summary(),
            "Follow-up for type 2 diabetes and hypertension."
        );
        let codes: Vec<&str> = result.codes().iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, ["E11.9", "I10", "93306"]);
        assert_eq!(result.codes()[2].code_type, CodeType::Cpt);
        assert!(result
            .codes()
            .iter()
            .all(|c| c.status == CodeStatus::Suggested));
    }

    #[test]
    fn empty_code_list_is_valid() {
        let result = parse_model_output(r#"{"summary":"Nothing billable.","codes":[]}"#)
            .expect("should parse");
        assert!(result.codes().is_empty());
    }

    #[test]
    fn tolerates_unknown_keys() {
        let raw = r#"{"summary":"s","model":"x","codes":[{"code":"I10","type":"ICD-10","description":"d","confidence":0.7,"rationale":"BP"}]}"#;
        let result = parse_model_output(raw).expect("should parse");
        assert_eq!(result.codes().len(), 1);
    }

    #[test]
    fn rejects_invalid_json() {
        let msg = expect_malformed("```json\n{\"summary\": \"oops\",\n```");
        assert!(msg.contains("schema mismatch"), "{msg}");
    }

    #[test]
    fn rejects_surrounding_prose() {
        expect_malformed(&format!("Here are the codes you asked for:\n{VALID}"));
        let msg = expect_malformed(&format!("{VALID}\nLet me know if you need more."));
        assert!(msg.contains("after JSON object"), "{msg}");
    }

    #[test]
    fn rejects_empty_output() {
        expect_malformed("");
        expect_malformed("```json\n```");
    }

    #[test]
    fn reports_path_of_missing_field() {
        let raw = r#"{"summary":"s","codes":[{"code":"I10","type":"ICD-10","description":"d"}]}"#;
        let msg = expect_malformed(raw);
        assert!(msg.contains("codes[0]"), "{msg}");
        assert!(msg.contains("confidence"), "{msg}");
    }

    #[test]
    fn reports_path_of_wrong_type() {
        let raw = r#"{"summary":"s","codes":[{"code":"I10","type":"ICD-10","description":"d","confidence":"high"}]}"#;
        let msg = expect_malformed(raw);
        assert!(msg.contains("codes[0].confidence"), "{msg}");
    }

    #[test]
    fn rejects_missing_summary() {
        let msg = expect_malformed(r#"{"codes":[]}"#);
        assert!(msg.contains("summary"), "{msg}");
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let raw = r#"{"summary":"s","codes":[{"code":"I10","type":"ICD-10","description":"d","confidence":1.5}]}"#;
        let msg = expect_malformed(raw);
        assert!(msg.contains("codes[0].confidence"), "{msg}");
    }

    #[test]
    fn rejects_blank_code() {
        let raw = r#"{"summary":"s","codes":[{"code":"  ","type":"CPT","description":"d","confidence":0.5}]}"#;
        let msg = expect_malformed(raw);
        assert!(msg.contains("codes[0].code"), "{msg}");
    }

    #[test]
    fn collapses_duplicate_codes_keeping_first() {
        let raw = r#"{"summary":"s","codes":[
            {"code":"I10","type":"ICD-10","description":"first","confidence":0.6},
            {"code":"E11.9","type":"ICD-10","description":"dm","confidence":0.9},
            {"code":" I10 ","type":"ICD-10","description":"second","confidence":0.99}
        ]}"#;
        let result = parse_model_output(raw).expect("should parse");
        assert_eq!(result.codes().len(), 2);
        assert_eq!(result.codes()[0].code, "I10");
        assert_eq!(result.codes()[0].description, "first");
        assert_eq!(result.codes()[1].code, "E11.9");
    }
}
