//! # QuickCode Core
//!
//! Core logic for the human-in-the-loop medical coding pipeline:
//! - [`gateway`]: clinical note -> prompt -> model provider -> validated [`AnalysisResult`]
//! - [`session`]: per-reviewer state machine over suggestions (accept/reject, derived accepted set)
//! - [`conflict`]: billing-conflict rule table and checker
//! - [`export`]: hand-off of accepted codes to the billing queue
//!
//! **No API concerns**: HTTP servers and request/response wire types belong in `api-rest` and
//! `api-shared`.

pub mod config;
pub mod conflict;
pub mod constants;
pub mod error;
pub mod export;
pub mod gateway;
pub mod model;
pub mod provider;
pub mod session;

pub use config::CoreConfig;
pub use conflict::{ConflictChecker, ConflictOutcome, ConflictReason, ConflictRule, ConflictRuleSet};
pub use error::{
    ConfigError, ExportError, ExtractionError, ExtractionResult, ProviderError, ReviewError,
    ReviewResult, RuleSetError,
};
pub use export::{ExportReceipt, ExportSink, LogExportSink, QueueExportSink};
pub use gateway::ExtractionGateway;
pub use model::{
    AnalysisResult, CodeStatus, CodeSuggestion, CodeType, ConfidenceBand, ReviewDecision,
};
pub use provider::{GeminiClient, TextCompletion};
pub use quickcode_types::NonEmptyText;
pub use session::{AnalysisOutcome, CheckOutcome, ReviewSession, SessionSnapshot};

use std::path::Path;
use std::sync::Arc;

/// Build the production gateway for a configuration.
///
/// # Errors
///
/// Returns [`ProviderError`] if the HTTP client cannot be created.
pub fn gemini_gateway(cfg: &CoreConfig) -> Result<ExtractionGateway, ProviderError> {
    let client = GeminiClient::new(cfg)?;
    Ok(ExtractionGateway::new(Arc::new(client)))
}

/// Load the conflict rule table: the YAML file at `path` if given, otherwise the seed table.
///
/// # Errors
///
/// Returns [`RuleSetError`] if the rule file cannot be read or is invalid.
pub fn load_conflict_rules(path: Option<&Path>) -> Result<ConflictRuleSet, RuleSetError> {
    match path {
        Some(path) => {
            tracing::info!("loading conflict rules from {}", path.display());
            ConflictRuleSet::from_yaml_file(path)
        }
        None => Ok(ConflictRuleSet::seed()),
    }
}

/// Build the conflict checker for a configuration.
///
/// # Errors
///
/// Returns [`RuleSetError`] if the configured rule file cannot be read or is invalid.
pub fn configured_checker(cfg: &CoreConfig) -> Result<ConflictChecker, RuleSetError> {
    let rules = load_conflict_rules(cfg.conflict_rules_path())?;
    Ok(ConflictChecker::new(rules))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn reasons(rules: &ConflictRuleSet) -> Vec<String> {
        rules.rules().iter().map(|r| r.reason().to_string()).collect()
    }

    fn config() -> CoreConfig {
        CoreConfig::new(Some("secret".into())).expect("config")
    }

    #[tokio::test]
    async fn rule_file_replaces_seed_table() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(
            br#"rules:
  - all_of: ["G0438", "99397"]
    reason: "Annual wellness visit overlaps preventive visit."
"#,
        )
        .expect("write rules");

        let cfg = config().with_conflict_rules_path(Some(file.path().to_path_buf()));
        let checker = configured_checker(&cfg).expect("checker");

        assert_eq!(
            reasons(checker.rules()),
            ["Annual wellness visit overlaps preventive visit."]
        );

        let seed_pair: Vec<CodeSuggestion> = constants::SEED_RULE_CODES
            .iter()
            .map(|code| CodeSuggestion::suggested(*code, CodeType::Cpt, "", 0.9))
            .collect();
        assert_eq!(checker.check(&seed_pair).await, ConflictOutcome::Clean);
    }

    #[test]
    fn without_rule_file_seed_table_is_used() {
        let checker = configured_checker(&config()).expect("checker");
        assert_eq!(reasons(checker.rules()), reasons(&ConflictRuleSet::seed()));
        assert_eq!(reasons(checker.rules()), [constants::SEED_RULE_REASON]);
    }

    #[test]
    fn unreadable_rule_file_is_an_error() {
        let cfg = config().with_conflict_rules_path(Some("/definitely/not/rules.yaml".into()));
        let err = configured_checker(&cfg).expect_err("missing file should fail");
        assert!(matches!(err, RuleSetError::FileRead(_)));
    }
}
