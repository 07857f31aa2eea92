use thiserror::Error;

use crate::util::truncate_to_char_boundary;

pub type Result<T> = std::result::Result<T, AiError>;

/// Longest slice of an error body kept in an `AiError::Api` message.
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No text in {0} response")]
    EmptyResponse(String),
}

impl AiError {
    pub(crate) fn api(provider: &str, status: reqwest::StatusCode, body: &str) -> Self {
        AiError::Api {
            provider: provider.to_string(),
            status: status.as_u16(),
            message: truncate_to_char_boundary(body.trim(), MAX_ERROR_BODY).to_string(),
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AiError::Parse(e.to_string())
        } else {
            AiError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for AiError {
    fn from(e: serde_json::Error) -> Self {
        AiError::Parse(e.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderValue> for AiError {
    fn from(e: reqwest::header::InvalidHeaderValue) -> Self {
        AiError::Config(format!("invalid header value: {e}"))
    }
}
