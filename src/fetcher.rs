use async_trait::async_trait;
use reqwest::{Client, header};
use std::time::Duration;
use url::Url;

use crate::config::ScraperConfig;
use crate::models::ProductIdentifier;
use crate::utils::error::{AppError, FetchError};

/// Retrieves the raw product page for an identifier.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Canonical page address for `identifier`.
    fn product_url(&self, identifier: &ProductIdentifier) -> Result<Url, FetchError>;

    async fn fetch(&self, identifier: &ProductIdentifier) -> Result<String, FetchError>;
}

/// Build `<base>/dp/<identifier>`.
pub fn product_url(base_url: &Url, identifier: &ProductIdentifier) -> Result<Url, FetchError> {
    base_url
        .join(&format!("/dp/{}", identifier))
        .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", base_url, e)))
}

#[derive(Clone)]
pub struct HttpPageFetcher {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpPageFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self, AppError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AppError::Internal(format!("Invalid scraper base_url '{}': {}", config.base_url, e)))?;

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::ACCEPT,
                    header::HeaderValue::from_static("text/html,application/xhtml+xml"),
                );
                headers.insert(
                    header::ACCEPT_LANGUAGE,
                    header::HeaderValue::from_static("en-US,en;q=0.9"),
                );
                headers
            })
            .build()?;

        Ok(Self {
            client,
            base_url,
            timeout: config.request_timeout(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    fn product_url(&self, identifier: &ProductIdentifier) -> Result<Url, FetchError> {
        product_url(&self.base_url, identifier)
    }

    async fn fetch(&self, identifier: &ProductIdentifier) -> Result<String, FetchError> {
        let url = self.product_url(identifier)?;
        let url_text = url.to_string();
        let start_time = std::time::Instant::now();

        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url_text.clone(),
                    timeout_ms: self.timeout.as_millis() as u64,
                }
            } else {
                FetchError::Network {
                    url: url_text.clone(),
                    message: e.to_string(),
                }
            }
        };

        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url_text.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(classify)?;
        tracing::debug!(
            "Fetched {} ({} bytes) in {}ms",
            url_text,
            body.len(),
            start_time.elapsed().as_millis()
        );
        Ok(body)
    }
}
