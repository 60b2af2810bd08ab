//! Provider seams and API clients for market data and news
//!
//! The orchestrator depends only on the traits below; the clients in the
//! submodules are the production implementations.

pub mod news;
pub mod yahoo;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{NewsArticle, PricePoint, Timeframe};

pub use news::NewsApiClient;
pub use yahoo::YahooFinanceClient;

/// Source of prices for a symbol
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Last close price
    async fn latest_price(&self, symbol: &str) -> Result<f64>;

    /// Close prices over `timeframe`, oldest first
    async fn price_history(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<PricePoint>>;
}

/// Source of recent news for a symbol
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Recent articles, most recent first
    async fn latest_articles(&self, symbol: &str) -> Result<Vec<NewsArticle>>;
}
