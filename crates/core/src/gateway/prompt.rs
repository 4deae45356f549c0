/// Build the extraction instruction for one clinical note.
///
/// The note is embedded verbatim. The same note always yields the same prompt.
pub fn build_extraction_prompt(note: &str) -> String {
    format!(
        r#"Analyze the following clinical note.
1. Extract the relevant ICD-10 and CPT billing codes.
2. Write a brief, one-sentence summary of the visit.
3. Give every code a confidence score from 0.0 to 1.0.

Note:
{note}

Respond with a single JSON object of exactly this shape and nothing else (no prose, no markdown):
{{
  "summary": "A one-sentence summary here.",
  "codes": [
    {{"code": "E11.9", "type": "ICD-10", "description": "Type 2 diabetes mellitus without complications", "confidence": 0.95}},
    {{"code": "I10", "type": "ICD-10", "description": "Essential (primary) hypertension", "confidence": 0.90}}
  ]
}}
"#
    )
}
