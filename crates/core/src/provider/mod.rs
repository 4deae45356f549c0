//! External text-completion providers.
//!
//! The extraction gateway only needs "prompt in, text out". Keeping that behind a trait lets
//! tests substitute scripted providers and keeps the Gemini HTTP details in one place.

mod gemini;

pub use gemini::GeminiClient;

use crate::error::ProviderError;

/// A single request/response text-completion call.
#[async_trait::async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}
