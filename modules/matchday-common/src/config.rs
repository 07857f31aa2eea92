use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    // Snapshot store; in-memory when unset
    pub database_url: Option<String>,

    // Data site the extractors read from
    pub source_base_url: String,

    // Acquisition medium
    pub page_backend: PageBackendConfig,

    // Environment enrichment
    pub openweather_api_key: Option<String>,
    pub nominatim_url: String,
    pub openweather_url: String,

    // Generation backends, in fan-out order
    pub providers: Vec<ProviderConfig>,

    pub timeouts: Timeouts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageBackendConfig {
    Chrome {
        binary: String,
    },
    Browserless {
        base_url: String,
        token: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
    Cohere,
    Anthropic,
    Mistral,
}

impl ProviderKind {
    /// Fixed fan-out order.
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::Gemini,
        ProviderKind::OpenAi,
        ProviderKind::Cohere,
        ProviderKind::Anthropic,
        ProviderKind::Mistral,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Cohere => "cohere",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Mistral => "mistral",
        }
    }

    fn key_var(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GOOGLE_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Cohere => "COHERE_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Mistral => "MISTRAL_API_KEY",
        }
    }

    fn model_var(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_MODEL",
            ProviderKind::OpenAi => "OPENAI_MODEL",
            ProviderKind::Cohere => "COHERE_MODEL",
            ProviderKind::Anthropic => "ANTHROPIC_MODEL",
            ProviderKind::Mistral => "MISTRAL_MODEL",
        }
    }

    fn base_url_var(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_BASE_URL",
            ProviderKind::OpenAi => "OPENAI_BASE_URL",
            ProviderKind::Cohere => "COHERE_BASE_URL",
            ProviderKind::Anthropic => "ANTHROPIC_BASE_URL",
            ProviderKind::Mistral => "MISTRAL_BASE_URL",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-1.5-flash",
            ProviderKind::OpenAi => "gpt-4",
            ProviderKind::Cohere => "command-r-plus",
            ProviderKind::Anthropic => "claude-3-opus-20240229",
            ProviderKind::Mistral => "mistral-large-latest",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: String,
    pub model: String,
    /// Proxy or self-hosted endpoint in place of the provider's own.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Per extractor step, including its page navigation.
    pub extract: Duration,
    /// Per weather call (geocode and current conditions each).
    pub weather: Duration,
    /// Per generation backend call.
    pub provider: Duration,
    /// Whole-request deadline, if any.
    pub request_deadline: Option<Duration>,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            extract: Duration::from_secs(10),
            weather: Duration::from_secs(10),
            provider: Duration::from_secs(60),
            request_deadline: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let page_backend = match env::var("PAGE_BACKEND")
            .unwrap_or_else(|_| "chrome".to_string())
            .to_lowercase()
            .as_str()
        {
            "chrome" => PageBackendConfig::Chrome {
                binary: env::var("CHROME_BIN").unwrap_or_else(|_| "chromium".to_string()),
            },
            "browserless" => PageBackendConfig::Browserless {
                base_url: env::var("BROWSERLESS_URL")
                    .context("BROWSERLESS_URL is required when PAGE_BACKEND=browserless")?,
                token: env::var("BROWSERLESS_TOKEN").ok(),
            },
            other => anyhow::bail!("PAGE_BACKEND must be chrome or browserless, got {other}"),
        };

        let providers = ProviderKind::ALL
            .iter()
            .filter_map(|kind| {
                let api_key = non_empty_env(kind.key_var())?;
                let model = non_empty_env(kind.model_var())
                    .unwrap_or_else(|| kind.default_model().to_string());
                Some(ProviderConfig {
                    kind: *kind,
                    api_key,
                    model,
                    base_url: non_empty_env(kind.base_url_var()),
                })
            })
            .collect();

        let defaults = Timeouts::default();
        let timeouts = Timeouts {
            extract: secs_env("EXTRACT_TIMEOUT_SECS")?.unwrap_or(defaults.extract),
            weather: secs_env("WEATHER_TIMEOUT_SECS")?.unwrap_or(defaults.weather),
            provider: secs_env("PROVIDER_TIMEOUT_SECS")?.unwrap_or(defaults.provider),
            request_deadline: secs_env("REQUEST_DEADLINE_SECS")?,
        };

        let config = Self {
            database_url: non_empty_env("DATABASE_URL"),
            source_base_url: env::var("SOURCE_BASE_URL")
                .context("SOURCE_BASE_URL environment variable not set")?
                .trim_end_matches('/')
                .to_string(),
            page_backend,
            openweather_api_key: non_empty_env("OPENWEATHER_API_KEY"),
            nominatim_url: env::var("NOMINATIM_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            openweather_url: env::var("OPENWEATHER_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org".to_string()),
            providers,
            timeouts,
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  SOURCE_BASE_URL: {}", self.source_base_url);
        tracing::info!("  DATABASE_URL: {}", preview_opt(&self.database_url));
        tracing::info!("  OPENWEATHER_API_KEY: {}", preview_opt(&self.openweather_api_key));
        match &self.page_backend {
            PageBackendConfig::Chrome { binary } => {
                tracing::info!("  PAGE_BACKEND: chrome ({binary})")
            }
            PageBackendConfig::Browserless { base_url, .. } => {
                tracing::info!("  PAGE_BACKEND: browserless ({base_url})")
            }
        }
        for provider in &self.providers {
            tracing::info!(
                "  {}: {} model={} base_url={}",
                provider.kind.key_var(),
                preview(&provider.api_key),
                provider.model,
                provider.base_url.as_deref().unwrap_or("<default>")
            );
        }
        if self.providers.is_empty() {
            tracing::warn!("No generation backends configured; commentary will be empty");
        }
    }
}

/// First few characters of a secret, for startup logs.
fn preview(val: &str) -> String {
    let head: String = val.chars().take(5).collect();
    format!("{}...({} chars)", head, val.chars().count())
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn secs_env(key: &str) -> Result<Option<Duration>> {
    match non_empty_env(key) {
        Some(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{key} must be a whole number of seconds"))?;
            Ok(Some(Duration::from_secs(secs)))
        }
        None => Ok(None),
    }
}
