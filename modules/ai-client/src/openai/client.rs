use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use super::types::*;
use crate::error::{AiError, Result};

pub(crate) const OPENAI_API_URL: &str = "https://api.openai.com/v1";

pub(crate) struct OpenAiClient<'a> {
    provider: &'a str,
    api_key: &'a str,
    http: &'a reqwest::Client,
    base_url: &'a str,
}

impl<'a> OpenAiClient<'a> {
    pub fn new(
        provider: &'a str,
        api_key: &'a str,
        http: &'a reqwest::Client,
        base_url: &'a str,
    ) -> Self {
        Self {
            provider,
            api_key,
            http,
            base_url,
        }
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

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        debug!(provider = self.provider, model = %request.model, "Chat completion request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AiError::api(self.provider, status, &error_text));
        }

        Ok(response.json().await?)
    }
}
