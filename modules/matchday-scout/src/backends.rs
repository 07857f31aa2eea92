use std::sync::Arc;

use ai_client::{Claude, Cohere, Gemini, LanguageModel, OpenAi};
use tracing::info;

use matchday_common::{ProviderConfig, ProviderKind};

use crate::narrative::SYSTEM_PREAMBLE;

/// Room for the JSON object plus a short comment.
const MAX_TOKENS: u32 = 1024;

/// One backend per configured provider, in configured order.
pub fn build_models(providers: &[ProviderConfig]) -> Vec<Arc<dyn LanguageModel>> {
    providers
        .iter()
        .map(|provider| {
            info!(backend = provider.kind.name(), model = %provider.model, "Generation backend enabled");
            build_model(provider)
        })
        .collect()
}

fn build_model(provider: &ProviderConfig) -> Arc<dyn LanguageModel> {
    let key = provider.api_key.as_str();
    let model = provider.model.as_str();
    let base_url = provider.base_url.as_deref();

    match provider.kind {
        ProviderKind::Gemini => {
            let mut ai = Gemini::new(key, model)
                .with_system(SYSTEM_PREAMBLE)
                .with_max_tokens(MAX_TOKENS);
            if let Some(url) = base_url {
                ai = ai.with_base_url(url);
            }
            Arc::new(ai)
        }
        ProviderKind::OpenAi | ProviderKind::Mistral => {
            let mut ai = if provider.kind == ProviderKind::Mistral {
                OpenAi::mistral(key, model)
            } else {
                OpenAi::new(key, model)
            }
            .with_system(SYSTEM_PREAMBLE)
            .with_max_tokens(MAX_TOKENS);
            if let Some(url) = base_url {
                ai = ai.with_base_url(url);
            }
            Arc::new(ai)
        }
        ProviderKind::Cohere => {
            let mut ai = Cohere::new(key, model)
                .with_system(SYSTEM_PREAMBLE)
                .with_max_tokens(MAX_TOKENS);
            if let Some(url) = base_url {
                ai = ai.with_base_url(url);
            }
            Arc::new(ai)
        }
        ProviderKind::Anthropic => {
            let mut ai = Claude::new(key, model)
                .with_system(SYSTEM_PREAMBLE)
                .with_max_tokens(MAX_TOKENS);
            if let Some(url) = base_url {
                ai = ai.with_base_url(url);
            }
            Arc::new(ai)
        }
    }
}
