//! Extraction gateway.
//!
//! Turns a free-text clinical note into a validated [`AnalysisResult`] by prompting an external
//! text-completion provider exactly once and validating what comes back. Retry policy is left
//! to callers; [`ExtractionError::is_retryable`] tells them when a retry makes sense.

mod parse;
mod prompt;

pub use parse::{parse_model_output, strip_code_fences};
pub use prompt::build_extraction_prompt;

use std::sync::Arc;

use quickcode_types::NonEmptyText;

use crate::error::{ExtractionError, ExtractionResult};
use crate::model::AnalysisResult;
use crate::provider::TextCompletion;

/// Service boundary between free text and structured code suggestions.
#[derive(Clone)]
pub struct ExtractionGateway {
    provider: Arc<dyn TextCompletion>,
}

impl ExtractionGateway {
    pub fn new(provider: Arc<dyn TextCompletion>) -> Self {
        Self { provider }
    }

    /// Analyse one clinical note.
    ///
    /// # Errors
    ///
    /// - [`ExtractionError::InvalidInput`] if the note is empty or whitespace-only. The provider
    ///   is not called.
    /// - [`ExtractionError::ServiceUnavailable`] if the provider call fails.
    /// - [`ExtractionError::MalformedModelOutput`] if the provider answered with text that is not
    ///   the expected JSON shape.
    pub async fn analyze(&self, note: &str) -> ExtractionResult<AnalysisResult> {
        let note = NonEmptyText::verbatim(note)
            .map_err(|_| ExtractionError::InvalidInput("clinical note is empty".into()))?;

        tracing::info!(note_len = note.as_str().len(), "received request to analyze note");

        let prompt = build_extraction_prompt(note.as_str());
        let raw = self.provider.complete(&prompt).await.map_err(|e| {
            tracing::error!("model provider call failed: {e}");
            ExtractionError::from(e)
        })?;

        tracing::info!(response_len = raw.len(), "model response received, parsing JSON");

        let result = parse_model_output(&raw).inspect_err(|e| {
            tracing::error!("rejecting model output: {e}");
        })?;

        tracing::info!(codes = result.codes().len(), "analysis complete");
        Ok(result)
    }
}
