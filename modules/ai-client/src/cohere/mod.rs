pub(crate) mod types;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use crate::error::{AiError, Result};
use crate::traits::LanguageModel;

use types::*;

const COHERE_API_URL: &str = "https://api.cohere.com/v2";

// =============================================================================
// Cohere
// =============================================================================

#[derive(Clone)]
pub struct Cohere {
    api_key: String,
    pub(crate) model: String,
    system: Option<String>,
    max_tokens: u32,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl Cohere {
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

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn request(&self, prompt: &str) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = self.system {
            messages.push(WireMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(WireMessage {
            role: "user",
            content: prompt.to_string(),
        });

        ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: 0.0,
        }
    }
}

#[async_trait]
impl LanguageModel for Cohere {
    fn name(&self) -> &str {
        "cohere"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/chat",
            self.base_url
                .as_deref()
                .unwrap_or(COHERE_API_URL)
                .trim_end_matches('/')
        );

        debug!(model = %self.model, "Cohere chat request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&self.request(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AiError::api("cohere", status, &error_text));
        }

        let body: ChatResponse = response.json().await?;

        body.text()
            .ok_or_else(|| AiError::EmptyResponse("cohere".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cohere_request_puts_system_first() {
        let ai = Cohere::new("co-test", "command-r-plus").with_system("analyst");
        let request = ai.request("predict");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[1].content, "predict");
    }

    #[test]
    fn test_cohere_without_system() {
        let ai = Cohere::new("co-test", "command-r-plus").with_max_tokens(500);
        let request = ai.request("predict");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.max_tokens, 500);
    }
}
