//! Yahoo Finance API client

use crate::api::MarketDataProvider;
use crate::error::{Result, StockError};
use crate::model::{PricePoint, Timeframe};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, instrument};
use yahoo_finance_api as yahoo;

const PROVIDER: &str = "yahoo-finance";

/// Yahoo Finance API client
pub struct YahooFinanceClient {
    connector: yahoo::YahooConnector,
    timeout: Duration,
}

impl YahooFinanceClient {
    /// Create a client whose calls give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let connector = yahoo::YahooConnector::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StockError::Config(format!("Failed to build Yahoo connector: {e}")))?;

        Ok(Self { connector, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get historical close prices between two instants
    pub async fn get_historical_closes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>> {
        // Convert chrono DateTime to time OffsetDateTime
        let start_odt = OffsetDateTime::from_unix_timestamp(start.timestamp()).map_err(|e| {
            StockError::Config(format!("Invalid start timestamp: {e}"))
        })?;
        let end_odt = OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| StockError::Config(format!("Invalid end timestamp: {e}")))?;

        let response = self
            .connector
            .get_quote_history(symbol, start_odt, end_odt)
            .await
            .map_err(unavailable)?;

        let quotes = response.quotes().map_err(|e| absent(symbol, &e))?;

        Ok(quotes
            .iter()
            .map(|q| PricePoint {
                timestamp: DateTime::from_timestamp(q.timestamp as i64, 0)
                    .unwrap_or_else(Utc::now),
                close: q.close,
            })
            .collect())
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    #[instrument(skip(self))]
    async fn latest_price(&self, symbol: &str) -> Result<f64> {
        let response = self
            .connector
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(unavailable)?;

        let quote = response.last_quote().map_err(|e| absent(symbol, &e))?;

        debug!(close = quote.close, "Fetched latest quote");
        Ok(quote.close)
    }

    #[instrument(skip(self))]
    async fn price_history(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<PricePoint>> {
        let end = Utc::now();
        let closes = self
            .get_historical_closes(symbol, timeframe.start_from(end), end)
            .await?;

        if closes.is_empty() {
            return Err(StockError::DataAbsent {
                symbol: symbol.to_string(),
                reason: format!("no prices over {timeframe}"),
            });
        }

        debug!(points = closes.len(), "Fetched price history");
        Ok(closes)
    }
}

fn unavailable(err: yahoo::YahooError) -> StockError {
    StockError::ProviderUnavailable {
        provider: PROVIDER,
        reason: err.to_string(),
    }
}

fn absent(symbol: &str, err: &yahoo::YahooError) -> StockError {
    StockError::DataAbsent {
        symbol: symbol.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> YahooFinanceClient {
        YahooFinanceClient::new(Duration::from_secs(30)).unwrap()
    }

    #[test]
    fn test_client_keeps_configured_timeout() {
        let client = YahooFinanceClient::new(Duration::from_secs(7)).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(7));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_latest_price() {
        let client = client();
        let price = client.latest_price("AAPL").await.unwrap();
        assert!(price > 0.0);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_price_history_one_month() {
        let client = client();
        let series = client
            .price_history("AAPL", Timeframe::OneMonth)
            .await
            .unwrap();
        assert!(!series.is_empty());
        assert!(series.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_unknown_symbol_is_an_error() {
        let client = client();
        assert!(client.latest_price("INVALID_SYMBOL_12345").await.is_err());
    }
}
