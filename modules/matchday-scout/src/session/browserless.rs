use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use browserless_client::BrowserlessClient;
use tracing::{debug, info};

use super::{Page, PageSession, SessionProvider};

/// How long Browserless may wait for an extractor's ready selector.
const READY_SELECTOR_TIMEOUT: Duration = Duration::from_secs(10);

pub struct BrowserlessSessionProvider {
    client: Arc<BrowserlessClient>,
}

impl BrowserlessSessionProvider {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        info!(base_url, "BrowserlessSessionProvider initialized");
        Self {
            client: Arc::new(BrowserlessClient::new(base_url, token)),
        }
    }
}

#[async_trait]
impl SessionProvider for BrowserlessSessionProvider {
    async fn acquire(&self) -> Result<Box<dyn PageSession>> {
        let version = self
            .client
            .version()
            .await
            .context("Browserless is not reachable")?;
        info!(browser = %version.browser, "Browserless session opened");

        Ok(Box::new(BrowserlessSession {
            client: self.client.clone(),
            released: false,
        }))
    }
}

struct BrowserlessSession {
    client: Arc<BrowserlessClient>,
    released: bool,
}

#[async_trait]
impl PageSession for BrowserlessSession {
    async fn navigate(&mut self, url: &str, ready_selector: Option<&str>) -> Result<Page> {
        if self.released {
            anyhow::bail!("Browserless session already released");
        }
        debug!(url, backend = "browserless", "Navigating");

        let html = match ready_selector {
            Some(selector) => {
                self.client
                    .content_when_ready(url, selector, READY_SELECTOR_TIMEOUT)
                    .await
            }
            None => self.client.content(url).await,
        }
        .with_context(|| format!("Browserless content request failed for {url}"))?;

        if html.is_empty() {
            anyhow::bail!("Browserless returned empty HTML for {url}");
        }

        Ok(Page {
            url: url.to_string(),
            html,
        })
    }

    async fn release(&mut self) {
        if !self.released {
            self.released = true;
            debug!("Browserless session released");
        }
    }
}
