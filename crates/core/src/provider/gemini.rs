use serde::{Deserialize, Serialize};

use super::TextCompletion;
use crate::config::CoreConfig;
use crate::error::ProviderError;

/// Gemini `generateContent` client.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Build a client from startup configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] if the HTTP client cannot be constructed.
    pub fn new(cfg: &CoreConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(cfg.provider_timeout())
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: cfg.api_base().trim_end_matches('/').to_string(),
            model: cfg.model().to_string(),
            api_key: cfg.api_key().to_string(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<ContentRequest<'a>>,
}

#[derive(Serialize)]
struct ContentRequest<'a> {
    parts: Vec<PartRequest<'a>>,
}

#[derive(Serialize)]
struct PartRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if it has any.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait::async_trait]
impl TextCompletion for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = GenerateContentRequest {
            contents: vec![ContentRequest {
                parts: vec![PartRequest { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Transport(format!("request timed out: {e}"))
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        parsed.into_text().ok_or(ProviderError::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).expect("response should deserialise")
    }

    #[test]
    fn joins_all_parts_of_first_candidate() {
        let response = parse(
            r#"{"candidates":[
                {"content":{"parts":[{"text":"{\"summary\":"},{"text":"\"x\"}"}]}},
                {"content":{"parts":[{"text":"ignored"}]}}
            ]}"#,
        );
        assert_eq!(response.into_text().as_deref(), Some("{\"summary\":\"x\"}"));
    }

    #[test]
    fn missing_candidates_yield_no_text() {
        assert_eq!(parse("{}").into_text(), None);
        assert_eq!(parse(r#"{"candidates":[{}]}"#).into_text(), None);
        assert_eq!(
            parse(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#).into_text(),
            None
        );
    }

    #[test]
    fn endpoint_includes_model() {
        let cfg = CoreConfig::new(Some("k".into()))
            .expect("config")
            .with_api_base("http://localhost:9999/v1beta/");
        let client = GeminiClient::new(&cfg).expect("client");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn request_body_shape() {
        let body = GenerateContentRequest {
            contents: vec![ContentRequest {
                parts: vec![PartRequest { text: "hello" }],
            }],
        };
        let json = serde_json::to_value(&body).expect("serialise");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
    }
}
