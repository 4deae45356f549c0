//! Hand-off of finalised accepted codes to the billing queue.
//!
//! Downstream processing is out of scope; a sink only has to take a batch or refuse it.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ExportError, ExportResult};
use crate::model::CodeSuggestion;

/// Destination for exported batches.
pub trait ExportSink: Send + Sync {
    fn submit(&self, codes: &[CodeSuggestion]) -> ExportResult<()>;
}

/// Acknowledgement that a batch was handed off.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExportReceipt {
    pub id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub codes: Vec<CodeSuggestion>,
}

/// Export an accepted set, preserving its order.
///
/// # Errors
///
/// Returns [`ExportError::NothingToExport`] for an empty set, before the sink is touched.
/// Sink failures are passed through unchanged.
pub fn export(sink: &dyn ExportSink, accepted: &[CodeSuggestion]) -> ExportResult<ExportReceipt> {
    if accepted.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    sink.submit(accepted)?;

    let receipt = ExportReceipt {
        id: Uuid::new_v4(),
        submitted_at: Utc::now(),
        codes: accepted.to_vec(),
    };
    tracing::info!(receipt = %receipt.id, codes = receipt.codes.len(), "exported accepted codes");
    Ok(receipt)
}

/// Writes each batch to the log as pretty JSON.
#[derive(Clone, Debug, Default)]
pub struct LogExportSink;

impl ExportSink for LogExportSink {
    fn submit(&self, codes: &[CodeSuggestion]) -> ExportResult<()> {
        let batch = serde_json::to_string_pretty(codes)
            .map_err(|e| ExportError::SinkFailed(e.to_string()))?;
        tracing::info!("--- EXPORTING TO BILLING QUEUE ---\n{batch}");
        Ok(())
    }
}

/// Keeps submitted batches in memory, in submission order.
#[derive(Debug, Default)]
pub struct QueueExportSink {
    batches: Mutex<Vec<Vec<CodeSuggestion>>>,
}

impl QueueExportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<Vec<CodeSuggestion>> {
        match self.batches.lock() {
            Ok(batches) => batches.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ExportSink for QueueExportSink {
    fn submit(&self, codes: &[CodeSuggestion]) -> ExportResult<()> {
        let mut batches = self
            .batches
            .lock()
            .map_err(|_| ExportError::SinkFailed("export queue lock poisoned".into()))?;
        batches.push(codes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CodeStatus, CodeType};

    fn accepted(code: &str) -> CodeSuggestion {
        CodeSuggestion {
            status: CodeStatus::Accepted,
            ..CodeSuggestion::suggested(code, CodeType::Icd10, "desc", 0.95)
        }
    }

    struct FailingSink;

    impl ExportSink for FailingSink {
        fn submit(&self, _codes: &[CodeSuggestion]) -> ExportResult<()> {
            Err(ExportError::SinkFailed("queue offline".into()))
        }
    }

    #[test]
    fn empty_export_fails_without_side_effects() {
        let sink = QueueExportSink::new();
        let err = export(&sink, &[]).expect_err("empty export should fail");
        assert!(matches!(err, ExportError::NothingToExport));
        assert!(sink.batches().is_empty());
    }

    #[test]
    fn single_code_export_yields_receipt() {
        let sink = QueueExportSink::new();
        let receipt = export(&sink, &[accepted("E11.9")]).expect("export should succeed");

        assert_eq!(receipt.codes.len(), 1);
        assert_eq!(receipt.codes[0].code, "E11.9");
        assert_eq!(sink.batches(), vec![vec![accepted("E11.9")]]);
    }

    #[test]
    fn export_preserves_order() {
        let sink = QueueExportSink::new();
        let codes = vec![accepted("I10"), accepted("E11.9"), accepted("R06.02")];
        let receipt = export(&sink, &codes).expect("export");
        let order: Vec<&str> = receipt.codes.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(order, ["I10", "E11.9", "R06.02"]);
    }

    #[test]
    fn sink_failure_is_propagated() {
        let err = export(&FailingSink, &[accepted("I10")]).expect_err("should fail");
        assert!(matches!(err, ExportError::SinkFailed(_)));
    }

    #[test]
    fn log_sink_accepts_batches() {
        assert!(LogExportSink.submit(&[accepted("I10")]).is_ok());
    }
}
