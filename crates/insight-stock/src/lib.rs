//! Stock insight orchestration
//!
//! This crate answers "get insights" requests for a ticker symbol. It includes:
//!
//! - Market data from Yahoo Finance (real-time price and close history)
//! - Latest headlines from NewsAPI
//! - PNG trend charts with a moving-average overlay
//! - A shared, bounded conversation history replayed into every prompt
//! - AI summaries from a hosted language model
//!
//! # Architecture
//!
//! [`InsightOrchestrator`] depends only on provider traits
//! ([`MarketDataProvider`], [`NewsProvider`], [`ChartRenderer`] and
//! `insight_llm::LLMProvider`), injected as `Arc<dyn Trait>`. Provider
//! failures are turned into in-band response values by the functions in
//! [`policy`], so a request always yields a full [`InsightResponse`].
//!
//! # Example
//!
//! ```rust,ignore
//! use insight_stock::{InsightConfig, InsightOrchestrator, StockQuery, Timeframe};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = InsightOrchestrator::from_config(InsightConfig::from_env()?)?;
//!
//!     let query = StockQuery::new("AAPL", Timeframe::OneYear, "How is Apple doing?");
//!     let response = orchestrator.handle(&query).await;
//!     println!("{}", serde_json::to_string_pretty(&response)?);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod chart;
pub mod config;
pub mod conversation;
pub mod error;
pub mod insight;
pub mod model;
pub mod policy;
pub mod prompts;

pub use api::{MarketDataProvider, NewsApiClient, NewsProvider, YahooFinanceClient};
pub use chart::{ChartRenderer, PngChartRenderer};
pub use config::{InsightConfig, LlmBackend};
pub use conversation::{ChatMessage, ChatRole, ConversationStore, MessageContent};
pub use error::{Result, StockError};
pub use insight::InsightOrchestrator;
pub use model::{
    AiSummary, ErrorValue, HistoricalTrend, InsightResponse, LatestNews, NewsArticle, PricePoint,
    RealTimePrice, StockQuery, Timeframe, TrendChart,
};
