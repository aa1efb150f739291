use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::domain::{ports::LlmService, DomainError};
use crate::infrastructure::config::LlmConfig;

/// Direct `generateContent` calls against the Gemini REST API.
///
/// Unlike [`super::GeminiLlm`] this keeps the HTTP status, so a quota
/// rejection (429) reaches callers as [`DomainError::RateLimited`].
pub struct GenerateContentClient {
    http: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentClient {
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::internal(format!("http client: {e}")))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, DomainError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| DomainError::validation("GEMINI_API_KEY is not set"))?;
        Self::new(
            config.api_base.clone(),
            config.model.clone(),
            api_key,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    async fn generate(&self, body: serde_json::Value) -> Result<String, DomainError> {
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DomainError::timeout("generateContent timed out")
                } else {
                    DomainError::external(format!("generateContent request failed: {e}"))
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DomainError::rate_limited("generateContent returned 429"));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::external(format!(
                "generateContent failed ({status}): {body}"
            )));
        }

        let payload = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| DomainError::external(format!("generateContent parse failed: {e}")))?;

        first_text(payload)
            .ok_or_else(|| DomainError::external("generateContent returned no text"))
    }
}

fn first_text(payload: GenerateContentResponse) -> Option<String> {
    payload
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text
}

#[async_trait]
impl LlmService for GenerateContentClient {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        self.generate(json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        }))
        .await
    }
}
