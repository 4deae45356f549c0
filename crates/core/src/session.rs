//! Review session state machine.
//!
//! A [`ReviewSession`] owns the suggestions of one note-review session and the transitions a
//! reviewer can make on them. Every code starts `suggested` and moves once to `accepted` or
//! `rejected`; the accepted set is always derived from the current statuses.
//!
//! Long-running calls (analysis, conflict check) never hold the state lock across an await.
//! Instead each one is tagged when it starts and its result is dropped if the session moved on
//! in the meantime:
//! - every analysis bumps a generation counter, so a slow earlier request can never overwrite
//!   a newer one regardless of completion order;
//! - every status change bumps a revision counter, so a conflict check computed against an
//!   older accepted set is never stored.

use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::conflict::{ConflictChecker, ConflictOutcome};
use crate::constants::{ANALYSIS_FAILED_MESSAGE, EMPTY_NOTE_MESSAGE, NOTHING_TO_EXPORT_MESSAGE};
use crate::error::{ExportError, ExtractionError, ReviewError, ReviewResult};
use crate::export::{self, ExportReceipt, ExportSink};
use crate::gateway::ExtractionGateway;
use crate::model::{CodeStatus, CodeSuggestion, ReviewDecision};

#[derive(Debug, Default)]
struct SessionState {
    codes: Vec<CodeSuggestion>,
    summary: String,
    conflict: Option<ConflictOutcome>,
    error: Option<String>,
    busy: bool,
    generation: u64,
    revision: u64,
}

impl SessionState {
    fn reset(&mut self) {
        self.codes.clear();
        self.summary.clear();
        self.conflict = None;
        self.error = None;
        self.busy = false;
        self.generation += 1;
        self.revision += 1;
    }

    fn accepted(&self) -> Vec<CodeSuggestion> {
        self.codes
            .iter()
            .filter(|c| c.status == CodeStatus::Accepted)
            .cloned()
            .collect()
    }
}

/// Read-only copy of a session's state.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub codes: Vec<CodeSuggestion>,
    pub summary: String,
    pub conflict: Option<ConflictOutcome>,
    pub error: Option<String>,
    pub busy: bool,
}

/// What happened to an analysis request once it resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// The result replaced the session's codes and summary.
    Applied { codes: usize },
    /// A newer analysis (or a reset) started first; the result was discarded.
    Superseded,
}

/// What happened to a conflict check once it resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    Applied(ConflictOutcome),
    /// Statuses changed while the check was running; the result was discarded.
    Stale,
}

/// One reviewer's session over one clinical note at a time.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct ReviewSession {
    id: Uuid,
    gateway: ExtractionGateway,
    checker: ConflictChecker,
    state: Arc<Mutex<SessionState>>,
}

impl ReviewSession {
    pub fn new(gateway: ExtractionGateway, checker: ConflictChecker) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(session = %id, "review session created");
        Self {
            id,
            gateway,
            checker,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        // State is plain data; a panic elsewhere cannot leave it half-updated in a way
        // that matters more than losing the session.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a new analysis, discarding everything from the previous one first.
    ///
    /// While the request is outstanding [`ReviewSession::busy`] is `true`; callers should not
    /// issue another analysis in that window, but if they do the later one wins.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Extraction`] if this (still current) request failed. The session
    /// is left with no codes and a user-facing message in [`SessionSnapshot::error`].
    pub async fn start_analysis(&self, note: &str) -> ReviewResult<AnalysisOutcome> {
        let generation = {
            let mut state = self.state();
            state.reset();
            state.busy = true;
            state.generation
        };

        let result = self.gateway.analyze(note).await;

        let mut state = self.state();
        if state.generation != generation {
            tracing::info!(
                session = %self.id,
                generation,
                current = state.generation,
                "discarding superseded analysis result"
            );
            return Ok(AnalysisOutcome::Superseded);
        }
        state.busy = false;

        match result {
            Ok(analysis) => {
                let (summary, codes) = analysis.into_parts();
                state.summary = summary;
                state.codes = codes;
                Ok(AnalysisOutcome::Applied {
                    codes: state.codes.len(),
                })
            }
            Err(err) => {
                tracing::warn!(session = %self.id, "analysis failed: {err}");
                state.error = Some(analysis_error_message(&err).to_string());
                Err(err.into())
            }
        }
    }

    /// Record a reviewer decision for one code.
    ///
    /// Repeating the same decision is a no-op success. Any successful call clears the stored
    /// conflict outcome, since it was computed against a different accepted set.
    ///
    /// # Errors
    ///
    /// - [`ReviewError::UnknownCode`] if no suggestion has this code.
    /// - [`ReviewError::AlreadyReviewed`] if the code already holds the opposite decision.
    pub fn set_status(&self, code: &str, decision: ReviewDecision) -> ReviewResult<()> {
        let requested = decision.status();
        let mut guard = self.state();
        let state = &mut *guard;

        let entry = state
            .codes
            .iter_mut()
            .find(|c| c.code == code)
            .ok_or_else(|| ReviewError::UnknownCode(code.to_string()))?;

        if entry.status.is_reviewed() && entry.status != requested {
            return Err(ReviewError::AlreadyReviewed {
                code: code.to_string(),
                current: entry.status,
                requested,
            });
        }

        entry.status = requested;
        state.conflict = None;
        state.revision += 1;
        Ok(())
    }

    /// The suggestions currently accepted, in suggestion order.
    pub fn accepted_codes(&self) -> Vec<CodeSuggestion> {
        self.state().accepted()
    }

    /// Run the conflict checker over the current accepted set.
    ///
    /// The outcome is stored only if no status changed while the check was running.
    pub async fn check_conflicts(&self) -> CheckOutcome {
        let (accepted, revision) = {
            let state = self.state();
            (state.accepted(), state.revision)
        };

        let outcome = self.checker.check(&accepted).await;

        let mut state = self.state();
        if state.revision != revision {
            tracing::info!(session = %self.id, "discarding stale conflict check result");
            return CheckOutcome::Stale;
        }
        state.conflict = Some(outcome.clone());
        CheckOutcome::Applied(outcome)
    }

    /// Hand the accepted set to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Export`] with [`ExportError::NothingToExport`] if nothing is
    /// accepted (the sink is not called), or the sink's own failure.
    pub fn export(&self, sink: &dyn ExportSink) -> ReviewResult<ExportReceipt> {
        let accepted = self.accepted_codes();
        match export::export(sink, &accepted) {
            Ok(receipt) => {
                self.state().error = None;
                Ok(receipt)
            }
            Err(err) => {
                let message = match err {
                    ExportError::NothingToExport => NOTHING_TO_EXPORT_MESSAGE.to_string(),
                    ExportError::SinkFailed(_) => format!("Export failed: {err}"),
                };
                self.state().error = Some(message);
                Err(err.into())
            }
        }
    }

    /// Drop all session state. Any in-flight analysis or check result will be discarded.
    pub fn clear(&self) {
        self.state().reset();
    }

    pub fn busy(&self) -> bool {
        self.state().busy
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            codes: state.codes.clone(),
            summary: state.summary.clone(),
            conflict: state.conflict.clone(),
            error: state.error.clone(),
            busy: state.busy,
        }
    }
}

fn analysis_error_message(err: &ExtractionError) -> &'static str {
    match err {
        ExtractionError::InvalidInput(_) => EMPTY_NOTE_MESSAGE,
        ExtractionError::ServiceUnavailable(_) | ExtractionError::MalformedModelOutput(_) => {
            ANALYSIS_FAILED_MESSAGE
        }
    }
}
