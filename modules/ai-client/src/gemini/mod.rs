pub(crate) mod types;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tracing::debug;

use crate::error::{AiError, Result};
use crate::traits::LanguageModel;

use types::*;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// =============================================================================
// Gemini
// =============================================================================

#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    pub(crate) model: String,
    system: Option<String>,
    max_tokens: u32,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl Gemini {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            system: None,
            max_tokens: 4096,
            base_url: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url
                .as_deref()
                .unwrap_or(GEMINI_API_URL)
                .trim_end_matches('/'),
            self.model
        )
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl LanguageModel for Gemini {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content::user(prompt)],
            system_instruction: self.system.as_deref().map(Content::instruction),
            generation_config: GenerationConfig {
                temperature: 0.0,
                max_output_tokens: self.max_tokens,
            },
        };

        debug!(model = %self.model, "Gemini generateContent request");

        let response = self
            .http
            .post(self.endpoint())
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AiError::api("gemini", status, &error_text));
        }

        let body: GenerateResponse = response.json().await?;

        body.text()
            .ok_or_else(|| AiError::EmptyResponse("gemini".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_endpoint() {
        let ai = Gemini::new("g-test", "gemini-1.5-flash");
        assert_eq!(
            ai.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_gemini_custom_base_url() {
        let ai = Gemini::new("g-test", "gemini-pro").with_base_url("http://localhost:9000/");
        assert_eq!(
            ai.endpoint(),
            "http://localhost:9000/models/gemini-pro:generateContent"
        );
    }
}
