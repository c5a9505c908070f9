use std::future::Future;

use reqwest::{Client, ClientBuilder};

use crate::config::ExtractConfig;
use crate::error::FetchError;
use crate::ratelimit::RateLimiter;

/// Source of raw page documents.
pub trait PageFetcher {
    /// Returns the document body, `FetchError::Status` for a non-success
    /// answer, or `FetchError::Transport` when no answer came back.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>>;
}

pub struct RequestClient {
    client: Client,
    rate_limiter: RateLimiter,
}

impl RequestClient {
    pub fn new(config: &ExtractConfig) -> anyhow::Result<Self> {
        let client = ClientBuilder::new()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()?;
        let rate_limiter = RateLimiter::new(config.request_delay);
        Ok(Self {
            client,
            rate_limiter,
        })
    }
}

impl PageFetcher for RequestClient {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        // Wait (non-blocking) until we're allowed to make a request according
        // to our self-imposed rate-limiting policy.
        self.rate_limiter.wait_until_ready().await;

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        Ok(body)
    }
}
