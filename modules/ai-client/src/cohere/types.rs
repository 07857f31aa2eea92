use serde::{Deserialize, Serialize};

// =============================================================================
// v2 Chat Request
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub(crate) struct WireMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

// =============================================================================
// v2 Chat Response
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatResponse {
    pub message: Option<AssistantMessage>,
    #[allow(dead_code)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AssistantMessage {
    #[serde(default)]
    pub content: Vec<ContentItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum ContentItem {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

impl ChatResponse {
    pub fn text(self) -> Option<String> {
        let text: String = self
            .message?
            .content
            .into_iter()
            .filter_map(|item| match item {
                ContentItem::Text { text } => Some(text),
                ContentItem::Other => None,
            })
            .collect();

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
