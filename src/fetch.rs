use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

const TIMEOUT_SECS: u64 = 20;
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Polite HTTP client shared by all source adapters: browser user agent,
/// bounded retries with exponential backoff, optional pause between
/// requests.
pub struct Fetcher {
    client: reqwest::Client,
    sleep: Duration,
}

impl Fetcher {
    pub fn new(sleep_seconds: f64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            sleep: Duration::from_secs_f64(sleep_seconds.max(0.0)),
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// GET a page, retrying on 429/5xx. Returns an empty string when the
    /// page stays unreachable so one bad URL never aborts a run.
    pub async fn get(&self, url: &str) -> String {
        let body = self.get_with_retry(url).await;
        if !self.sleep.is_zero() {
            tokio::time::sleep(self.sleep).await;
        }
        body
    }

    async fn get_with_retry(&self, url: &str) -> String {
        for attempt in 0..=MAX_RETRIES {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        match response.text().await {
                            Ok(body) => return body,
                            Err(e) => {
                                warn!("fetch {} body read failed: {}", url, e);
                                return String::new();
                            }
                        }
                    }
                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    if !retryable || attempt == MAX_RETRIES {
                        warn!("fetch {} -> {}", url, status);
                        return String::new();
                    }
                }
                Err(e) => {
                    if attempt == MAX_RETRIES {
                        warn!("fetch {} failed: {}", url, e);
                        return String::new();
                    }
                }
            }

            let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
            warn!(
                "fetch {} retrying (attempt {}/{}) after {:.1}s",
                url,
                attempt + 1,
                MAX_RETRIES,
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
        }
        String::new()
    }
}
