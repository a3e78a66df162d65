use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::ScraperConfig;
use crate::utils::error::AppError;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchedPage {
    pub body: String,
    pub final_url: String, // After redirects
    pub response_time_ms: u64,
}

/// Retrieves raw page content.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// Plain HTTP fetcher with a browser-like identity and a bounded timeout.
#[derive(Clone, Debug)]
pub struct WebScraper {
    client: Client,
}

impl WebScraper {
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| AppError::Validation(format!("Invalid user agent: {}", e)))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("de-DE,de;q=0.9,en;q=0.8"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for WebScraper {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let start_time = std::time::Instant::now();

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(AppError::Fetch {
                url: url.to_string(),
                message: format!("unexpected status {}", status),
            });
        }

        let body = response.text().await?;
        let response_time_ms = start_time.elapsed().as_millis() as u64;

        tracing::debug!("Fetched {} ({} bytes) in {}ms", final_url, body.len(), response_time_ms);

        Ok(FetchedPage {
            body,
            final_url,
            response_time_ms,
        })
    }
}
