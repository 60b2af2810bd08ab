//! NewsAPI client for the latest headlines about a symbol

use crate::api::NewsProvider;
use crate::config::DEFAULT_NEWS_API_BASE;
use crate::error::{Result, StockError};
use crate::model::NewsArticle;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const PROVIDER: &str = "newsapi";

/// Shape of the `/everything` response; only the articles are used
#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<NewsArticle>,
}

/// NewsAPI `/everything` client
pub struct NewsApiClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl NewsApiClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `api_key` - NewsAPI key; an empty key is sent as-is and rejected upstream
    /// * `timeout` - Per-request timeout
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StockError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base: DEFAULT_NEWS_API_BASE.to_string(),
        })
    }

    /// Point the client at a different base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Search articles mentioning `query`, newest first
    pub async fn everything(&self, query: &str) -> Result<Vec<NewsArticle>> {
        let url = format!("{}/everything", self.api_base);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("sortBy", "publishedAt"),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| StockError::ProviderUnavailable {
                provider: PROVIDER,
                reason: format!("NewsAPI request failed: {e}"),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(%status, body, "NewsAPI returned an error");
            return Err(StockError::ProviderRejected {
                provider: PROVIDER,
                status: status.as_u16(),
                reason: "Failed to fetch news".to_string(),
            });
        }

        let body: EverythingResponse = response.json().await.map_err(|e| {
            StockError::ProviderUnavailable {
                provider: PROVIDER,
                reason: format!("Failed to parse NewsAPI response: {e}"),
            }
        })?;

        Ok(body.articles)
    }
}

#[async_trait]
impl NewsProvider for NewsApiClient {
    #[instrument(skip(self))]
    async fn latest_articles(&self, symbol: &str) -> Result<Vec<NewsArticle>> {
        let articles = self.everything(symbol).await?;
        debug!(count = articles.len(), "Fetched articles");
        Ok(articles)
    }
}
