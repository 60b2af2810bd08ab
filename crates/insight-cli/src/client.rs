//! HTTP client for the insight server

use anyhow::{Context, bail};
use insight_stock::{InsightResponse, StockQuery};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Talks to `POST /summary` on a running insight server
pub struct InsightClient {
    http: Client,
    base_url: String,
}

impl InsightClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Request insights; any non-2xx status is an error
    pub async fn summary(&self, query: &StockQuery) -> anyhow::Result<InsightResponse> {
        let url = format!("{}/summary", self.base_url);
        debug!(%url, symbol = %query.symbol, "Requesting insights");

        let response = self.http.post(&url).json(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("server returned {status}: {body}");
        }

        Ok(response.json().await?)
    }
}
