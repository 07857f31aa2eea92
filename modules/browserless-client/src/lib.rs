pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

/// Browser build reported by `/json/version`.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser", default)]
    pub browser: String,
    #[serde(rename = "User-Agent", default)]
    pub user_agent: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentRequest<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    wait_for_selector: Option<WaitForSelector<'a>>,
}

#[derive(Debug, Serialize)]
struct WaitForSelector<'a> {
    selector: &'a str,
    timeout: u64,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        Self::with_timeout(base_url, token, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, token: Option<&str>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        let mut endpoint = format!("{}{}", self.base_url, path);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    /// Liveness probe: the browser build behind this Browserless instance.
    pub async fn version(&self) -> Result<BrowserVersion> {
        let resp = self.client.get(self.endpoint("/json/version")).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }

    /// Fetch fully-rendered HTML content for a URL via Browserless /content endpoint.
    pub async fn content(&self, url: &str) -> Result<String> {
        self.post_content(&ContentRequest {
            url,
            wait_for_selector: None,
        })
        .await
    }

    /// Like [`content`](Self::content), but waits (up to `timeout`) for
    /// `selector` to appear before the DOM is serialized.
    pub async fn content_when_ready(
        &self,
        url: &str,
        selector: &str,
        timeout: Duration,
    ) -> Result<String> {
        self.post_content(&ContentRequest {
            url,
            wait_for_selector: Some(WaitForSelector {
                selector,
                timeout: timeout.as_millis() as u64,
            }),
        })
        .await
    }

    async fn post_content(&self, body: &ContentRequest<'_>) -> Result<String> {
        debug!(url = body.url, "Browserless content request");

        let resp = self
            .client
            .post(self.endpoint("/content"))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}
