//! Acquisition sessions: an exclusive handle on a page-rendering backend that
//! the extractors drive one page at a time.

mod browserless;
mod chrome;

pub use browserless::BrowserlessSessionProvider;
pub use chrome::ChromeSessionProvider;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use matchday_common::PageBackendConfig;

/// A rendered page as seen by the extractors.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub html: String,
}

/// One open acquisition session.
///
/// Held by `&mut` for its whole lifetime, so only one navigation can be in
/// flight per session.
#[async_trait]
pub trait PageSession: Send {
    /// Load `url` and return the rendered DOM. When `ready_selector` is given
    /// the backend may wait for it to appear before serializing.
    async fn navigate(&mut self, url: &str, ready_selector: Option<&str>) -> Result<Page>;

    /// Free the backend resources. Safe to call more than once.
    async fn release(&mut self);
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn PageSession>>;
}

/// Build the provider selected by `PAGE_BACKEND`.
pub fn provider_from_config(backend: &PageBackendConfig) -> Arc<dyn SessionProvider> {
    match backend {
        PageBackendConfig::Chrome { binary } => Arc::new(ChromeSessionProvider::new(binary)),
        PageBackendConfig::Browserless { base_url, token } => Arc::new(
            BrowserlessSessionProvider::new(base_url, token.as_deref()),
        ),
    }
}
