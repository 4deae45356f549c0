//! Billing-conflict checking for accepted codes.
//!
//! Rules are data: each one pairs a predicate over the set of present code literals with a
//! human-readable reason. The checker only walks the table, so real compliance rules can be
//! swapped in (in code or from a YAML file) without touching its control flow.
//!
//! This is a placeholder policy, not a certified NCCI engine.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CLEAN_CHECK_MESSAGE, NO_ACCEPTED_CODES_MESSAGE, SEED_RULE_CODES, SEED_RULE_REASON,
};
use crate::error::{RuleSetError, RuleSetResult};
use crate::model::CodeSuggestion;

type CodePredicate = dyn Fn(&BTreeSet<String>) -> bool + Send + Sync;

/// One billing-exclusivity rule.
#[derive(Clone)]
pub struct ConflictRule {
    reason: String,
    predicate: Arc<CodePredicate>,
}

impl ConflictRule {
    /// Build a rule from an arbitrary predicate over the present code literals.
    pub fn new(
        reason: impl Into<String>,
        predicate: impl Fn(&BTreeSet<String>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            reason: reason.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Rule that fires when every one of `codes` is present.
    pub fn all_present<I, S>(codes: I, reason: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let required: Vec<String> = codes.into_iter().map(Into::into).collect();
        Self::new(reason, move |present| {
            required.iter().all(|code| present.contains(code))
        })
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn matches(&self, present: &BTreeSet<String>) -> bool {
        (self.predicate)(present)
    }
}

impl std::fmt::Debug for ConflictRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictRule")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// Ordered, extensible table of conflict rules.
#[derive(Clone, Debug, Default)]
pub struct ConflictRuleSet {
    rules: Vec<ConflictRule>,
}

impl ConflictRuleSet {
    /// An empty table. Every non-empty accepted set checks clean against it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table: 99214 and 99396 are not billable together.
    pub fn seed() -> Self {
        Self::empty().with_rule(ConflictRule::all_present(SEED_RULE_CODES, SEED_RULE_REASON))
    }

    pub fn with_rule(mut self, rule: ConflictRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn push(&mut self, rule: ConflictRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[ConflictRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Parse a rule table from YAML text.
    ///
    /// ```yaml
    /// rules:
    ///   - all_of: ["99214", "99396"]
    ///     reason: "Conflict: 99214 and 99396 generally not billable together."
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`RuleSetError`] if:
    /// - the YAML does not match the schema (unknown keys are rejected),
    /// - a rule names fewer than two distinct codes,
    /// - a rule has a blank code or reason.
    pub fn from_yaml_str(yaml_text: &str) -> RuleSetResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        let wire = serde_path_to_error::deserialize::<_, RuleFileWire>(deserializer).map_err(
            |err| {
                let path = err.path().to_string();
                RuleSetError::Schema {
                    path: if path.is_empty() || path == "." {
                        "<root>".into()
                    } else {
                        path
                    },
                    message: err.into_inner().to_string(),
                }
            },
        )?;

        let mut set = Self::empty();
        for (index, rule) in wire.rules.into_iter().enumerate() {
            let reason = rule.reason.trim();
            if reason.is_empty() {
                return Err(RuleSetError::InvalidRule {
                    index,
                    reason: "reason cannot be empty".into(),
                });
            }
            let codes: BTreeSet<String> = rule
                .all_of
                .iter()
                .map(|c| c.trim().to_string())
                .collect();
            if codes.iter().any(String::is_empty) {
                return Err(RuleSetError::InvalidRule {
                    index,
                    reason: "codes cannot be blank".into(),
                });
            }
            if codes.len() < 2 {
                return Err(RuleSetError::InvalidRule {
                    index,
                    reason: "a rule needs at least two distinct codes".into(),
                });
            }
            set.push(ConflictRule::all_present(codes, reason));
        }

        Ok(set)
    }

    /// Read and parse a YAML rule file.
    pub fn from_yaml_file(path: &Path) -> RuleSetResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Evaluate the table against a set of present code literals.
    pub fn evaluate(&self, present: &BTreeSet<String>) -> Vec<ConflictReason> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(present))
            .map(|rule| ConflictReason {
                reason: rule.reason.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFileWire {
    rules: Vec<RuleWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleWire {
    all_of: Vec<String>,
    reason: String,
}

/// Why a conflict was reported.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReason {
    pub reason: String,
}

/// Result of one conflict check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConflictOutcome {
    Clean,
    Info(String),
    Conflict(Vec<ConflictReason>),
}

impl ConflictOutcome {
    /// One-line text suitable for showing to a reviewer.
    pub fn message(&self) -> String {
        match self {
            ConflictOutcome::Clean => CLEAN_CHECK_MESSAGE.to_string(),
            ConflictOutcome::Info(message) => message.clone(),
            ConflictOutcome::Conflict(reasons) => reasons
                .iter()
                .map(|r| r.reason.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Runs accepted codes through a rule table.
#[derive(Clone, Debug)]
pub struct ConflictChecker {
    rules: Arc<ConflictRuleSet>,
    latency: Option<Duration>,
}

impl Default for ConflictChecker {
    fn default() -> Self {
        Self::new(ConflictRuleSet::seed())
    }
}

impl ConflictChecker {
    pub fn new(rules: ConflictRuleSet) -> Self {
        Self {
            rules: Arc::new(rules),
            latency: None,
        }
    }

    /// Simulate a remote rule engine by waiting before each evaluation.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn rules(&self) -> &ConflictRuleSet {
        &self.rules
    }

    /// Check an accepted set.
    ///
    /// An empty set yields [`ConflictOutcome::Info`] without consulting the table.
    pub async fn check(&self, accepted: &[CodeSuggestion]) -> ConflictOutcome {
        if accepted.is_empty() {
            return ConflictOutcome::Info(NO_ACCEPTED_CODES_MESSAGE.to_string());
        }

        let present: BTreeSet<String> = accepted.iter().map(|c| c.code.clone()).collect();

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let conflicts = self.rules.evaluate(&present);
        if conflicts.is_empty() {
            tracing::info!(codes = present.len(), "conflict check clean");
            ConflictOutcome::Clean
        } else {
            tracing::info!(
                codes = present.len(),
                conflicts = conflicts.len(),
                "conflict check found conflicts"
            );
            ConflictOutcome::Conflict(conflicts)
        }
    }
}
