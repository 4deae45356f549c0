use crate::model::CodeStatus;

/// Failures of the external text-completion provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("failed to reach model provider: {0}")]
    Transport(String),
    #[error("model provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode model provider response: {0}")]
    Decode(String),
    #[error("model provider returned no completion text")]
    EmptyCompletion,
}

/// Failures of the extraction gateway.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("model provider unavailable: {0}")]
    ServiceUnavailable(#[source] ProviderError),
    #[error("malformed model output: {0}")]
    MalformedModelOutput(String),
}

impl ExtractionError {
    /// Whether a caller may reasonably retry the same request.
    ///
    /// Only provider outages are retryable. Malformed output points at a prompt or model
    /// robustness problem and invalid input will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExtractionError::ServiceUnavailable(_))
    }
}

impl From<ProviderError> for ExtractionError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::EmptyCompletion => {
                ExtractionError::MalformedModelOutput("model returned no text".into())
            }
            other => ExtractionError::ServiceUnavailable(other),
        }
    }
}

pub type ExtractionResult<T> = std::result::Result<T, ExtractionError>;

/// Failures when handing accepted codes to the export sink.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no codes have been accepted for export")]
    NothingToExport,
    #[error("export sink rejected the batch: {0}")]
    SinkFailed(String),
}

pub type ExportResult<T> = std::result::Result<T, ExportError>;

/// Failures of review session transitions.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("code {0} is not part of the current analysis")]
    UnknownCode(String),
    #[error("code {code} was already {current} and cannot be changed to {requested}")]
    AlreadyReviewed {
        code: String,
        current: CodeStatus,
        requested: CodeStatus,
    },
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

pub type ReviewResult<T> = std::result::Result<T, ReviewError>;

/// Failures while resolving startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Failures while loading a conflict rule table.
#[derive(Debug, thiserror::Error)]
pub enum RuleSetError {
    #[error("failed to read rule file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("rule table schema mismatch at {path}: {message}")]
    Schema { path: String, message: String },
    #[error("rule {index} is invalid: {reason}")]
    InvalidRule { index: usize, reason: String },
}

pub type RuleSetResult<T> = std::result::Result<T, RuleSetError>;
