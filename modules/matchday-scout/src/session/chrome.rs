// Headless Chromium sessions driven through `--dump-dom`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::{Page, PageSession, SessionProvider};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const WINDOW_SIZE: &str = "1920,1080";
/// Budget for page scripts before the DOM is dumped.
const VIRTUAL_TIME_BUDGET_MS: u64 = 5_000;
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
/// Max retry attempts for transient Chrome failures.
const CHROME_MAX_ATTEMPTS: u32 = 3;
/// Base backoff for retries. Actual delay is base * 3^attempt + jitter.
const CHROME_RETRY_BASE: Duration = Duration::from_secs(1);

pub struct ChromeSessionProvider {
    binary: String,
}

impl ChromeSessionProvider {
    pub fn new(binary: &str) -> Self {
        info!(binary, "ChromeSessionProvider initialized");
        Self {
            binary: binary.to_string(),
        }
    }

    /// `<binary> --version`, failing when the browser cannot be launched.
    async fn probe(&self) -> Result<String> {
        let output = tokio::time::timeout(
            PROBE_TIMEOUT,
            tokio::process::Command::new(&self.binary)
                .arg("--version")
                .output(),
        )
        .await
        .with_context(|| format!("{} --version timed out", self.binary))?
        .with_context(|| format!("Failed to launch {}", self.binary))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} --version exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl SessionProvider for ChromeSessionProvider {
    async fn acquire(&self) -> Result<Box<dyn PageSession>> {
        let version = self.probe().await?;
        let profile = tempfile::Builder::new()
            .prefix("matchday-chrome-")
            .tempdir()
            .context("Failed to create temp profile dir")?;

        info!(version = %version, profile = %profile.path().display(), "Chrome session opened");

        Ok(Box::new(ChromeSession {
            binary: self.binary.clone(),
            profile: Some(profile),
        }))
    }
}

/// A Chromium profile directory reused for every page of one fixture.
/// Dropping the session removes the directory even if `release` never ran.
struct ChromeSession {
    binary: String,
    profile: Option<TempDir>,
}

impl ChromeSession {
    async fn run_chrome(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = url::Url::parse(url).context("Invalid URL")?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!("Only http/https URLs allowed, got: {}", parsed.scheme());
        }

        let profile = self
            .profile
            .as_ref()
            .context("Chrome session already released")?;
        let profile_arg = format!("--user-data-dir={}", profile.path().display());
        let window_arg = format!("--window-size={WINDOW_SIZE}");
        let agent_arg = format!("--user-agent={USER_AGENT}");
        let budget_arg = format!("--virtual-time-budget={VIRTUAL_TIME_BUDGET_MS}");

        let mut last_error = None;
        for attempt in 0..CHROME_MAX_ATTEMPTS {
            let result = tokio::time::timeout(
                NAVIGATION_TIMEOUT,
                tokio::process::Command::new(&self.binary)
                    .args([
                        "--headless",
                        "--no-sandbox",
                        "--disable-gpu",
                        "--disable-dev-shm-usage",
                        "--disable-extensions",
                        &window_arg,
                        &agent_arg,
                        &profile_arg,
                        &budget_arg,
                        "--dump-dom",
                        url,
                    ])
                    .kill_on_drop(true)
                    .output(),
            )
            .await;

            let retryable = attempt + 1 < CHROME_MAX_ATTEMPTS;
            match result {
                Ok(Ok(output)) if output.status.success() => {
                    if output.stdout.is_empty() && retryable {
                        warn!(url, attempt = attempt + 1, "Chrome returned empty DOM, retrying");
                        retry_with_backoff(attempt).await;
                        continue;
                    }
                    return Ok(output.stdout);
                }
                Ok(Ok(output)) => {
                    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                    if is_transient_error(&stderr) && retryable {
                        warn!(url, attempt = attempt + 1, "Chrome hit a transient error, retrying");
                        retry_with_backoff(attempt).await;
                        continue;
                    }
                    anyhow::bail!("Chrome exited with {} for {url}: {}", output.status, stderr.trim());
                }
                Ok(Err(e)) => {
                    if is_transient_error(&e.to_string()) && retryable {
                        warn!(url, attempt = attempt + 1, error = %e, "Chrome launch failed, retrying");
                        retry_with_backoff(attempt).await;
                        last_error = Some(e.to_string());
                        continue;
                    }
                    anyhow::bail!("Failed to run Chrome for {url}: {e}");
                }
                Err(_) => {
                    last_error = Some(format!(
                        "Chrome timed out after {}s for {url}",
                        NAVIGATION_TIMEOUT.as_secs()
                    ));
                    if retryable {
                        warn!(url, attempt = attempt + 1, "Chrome timed out, retrying");
                        retry_with_backoff(attempt).await;
                        continue;
                    }
                }
            }
        }

        Err(anyhow::anyhow!(last_error.unwrap_or_else(|| format!("Chrome gave up on {url}"))))
    }
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn navigate(&mut self, url: &str, _ready_selector: Option<&str>) -> Result<Page> {
        debug!(url, backend = "chrome", "Navigating");

        let html_bytes = self.run_chrome(url).await?;
        if html_bytes.is_empty() {
            anyhow::bail!("Chrome returned an empty DOM for {url}");
        }

        let html = String::from_utf8_lossy(&html_bytes).into_owned();
        debug!(url, backend = "chrome", bytes = html.len(), "Page rendered");

        Ok(Page {
            url: url.to_string(),
            html,
        })
    }

    async fn release(&mut self) {
        let Some(profile) = self.profile.take() else {
            return;
        };
        let path = profile.path().display().to_string();
        match profile.close() {
            Ok(()) => debug!(profile = %path, "Chrome session released"),
            Err(e) => warn!(profile = %path, error = %e, "Failed to remove Chrome profile dir"),
        }
    }
}

fn is_transient_error(msg: &str) -> bool {
    msg.contains("Cannot fork") || msg.contains("Resource temporarily unavailable")
}

async fn retry_with_backoff(attempt: u32) {
    let backoff = CHROME_RETRY_BASE * 3u32.pow(attempt);
    let jitter = Duration::from_millis(rand::rng().random_range(0..1000));
    tokio::time::sleep(backoff + jitter).await;
}
