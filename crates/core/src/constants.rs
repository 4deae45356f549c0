//! Constants used throughout the QuickCode core crate.
//!
//! Provider defaults, user-facing messages and the seed conflict rule live here so the
//! REST layer, the CLI and the tests agree on the exact wording.

/// Default Gemini model used for code extraction.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Default base URL of the Gemini REST API.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default timeout for a single provider call, in seconds.
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;

/// Default port for the REST server.
pub const DEFAULT_PORT: u16 = 3001;

/// Shown when a conflict check runs against an empty accepted set.
pub const NO_ACCEPTED_CODES_MESSAGE: &str = "No accepted codes to check.";

/// Shown when a conflict check finds nothing.
pub const CLEAN_CHECK_MESSAGE: &str = "No NCCI edit conflicts found.";

/// Shown when an export is attempted with nothing accepted.
pub const NOTHING_TO_EXPORT_MESSAGE: &str = "No codes have been accepted for export.";

/// Shown when an analysis is requested for a blank note.
pub const EMPTY_NOTE_MESSAGE: &str = "Please paste a clinical note to analyze.";

/// Shown when the gateway fails for any reason other than invalid input.
pub const ANALYSIS_FAILED_MESSAGE: &str = "Failed to analyze the note. Please try again.";

/// Codes in the seed conflict rule.
pub const SEED_RULE_CODES: [&str; 2] = ["99214", "99396"];

/// Reason reported by the seed conflict rule.
pub const SEED_RULE_REASON: &str = "Conflict: 99214 and 99396 generally not billable together.";
