mod client;
pub(crate) mod types;

use async_trait::async_trait;

use crate::error::{AiError, Result};
use crate::traits::LanguageModel;

use client::{OpenAiClient, OPENAI_API_URL};

const MISTRAL_API_URL: &str = "https://api.mistral.ai/v1";

// =============================================================================
// OpenAi
// =============================================================================

/// Chat-completions backend. Also drives OpenAI-compatible providers
/// (see [`OpenAi::mistral`]) through `with_base_url` and `with_name`.
#[derive(Clone)]
pub struct OpenAi {
    name: String,
    api_key: String,
    pub(crate) model: String,
    system: Option<String>,
    max_tokens: u32,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: "openai".to_string(),
            api_key: api_key.into(),
            model: model.into(),
            system: None,
            max_tokens: 4096,
            base_url: None,
            http: reqwest::Client::new(),
        }
    }

    /// Mistral's OpenAI-compatible chat endpoint.
    pub fn mistral(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(api_key, model)
            .with_name("mistral")
            .with_base_url(MISTRAL_API_URL)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
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

    fn client(&self) -> OpenAiClient<'_> {
        OpenAiClient::new(
            &self.name,
            &self.api_key,
            &self.http,
            self.base_url.as_deref().unwrap_or(OPENAI_API_URL),
        )
    }
}

#[async_trait]
impl LanguageModel for OpenAi {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut request = types::ChatRequest::new(&self.model);
        if let Some(ref system) = self.system {
            request = request.message(types::WireMessage::system(system));
        }
        request = request.message(types::WireMessage::user(prompt));

        if types::uses_max_completion_tokens(&self.model) {
            request = request.max_completion_tokens(self.max_tokens);
        } else {
            request = request.max_tokens(self.max_tokens).temperature(0.0);
        }

        let response = self.client().chat(&request).await?;

        response
            .text()
            .ok_or_else(|| AiError::EmptyResponse(self.name.clone()))
    }
}
