//! Substitution policy for provider failures
//!
//! Provider calls return `Result`; these functions turn each result into the
//! response field the client sees. A failure is logged and replaced with a
//! placeholder or an in-band error object, never propagated.

use crate::error::StockError;
use crate::model::{AiSummary, ErrorValue, HistoricalTrend, LatestNews, RealTimePrice, TrendChart};
use tracing::warn;

/// Price, or the `N/A` placeholder
pub fn resolve_price(result: Result<f64, StockError>) -> RealTimePrice {
    match result {
        Ok(price) => RealTimePrice::Value(price),
        Err(e) => {
            warn!(provider = e.provider(), error = %e, "Real-time price unavailable");
            RealTimePrice::unavailable()
        }
    }
}

pub fn resolve_trend(result: Result<TrendChart, StockError>) -> HistoricalTrend {
    match result {
        Ok(chart) => HistoricalTrend::Chart(chart),
        Err(e) => {
            warn!(provider = e.provider(), error = %e, "Historical trend unavailable");
            HistoricalTrend::Failed(ErrorValue::new(e.to_string()))
        }
    }
}

/// Headline list; a failure stays an error value rather than an empty list
pub fn resolve_news(result: Result<Vec<String>, StockError>) -> LatestNews {
    match result {
        Ok(headlines) => LatestNews::Headlines(headlines),
        Err(e) => {
            warn!(provider = e.provider(), error = %e, "Latest news unavailable");
            LatestNews::Failed(ErrorValue::new(news_error_message(&e)))
        }
    }
}

pub fn resolve_summary(result: Result<String, StockError>) -> AiSummary {
    match result {
        Ok(text) => AiSummary::Text(text),
        Err(e) => {
            warn!(provider = e.provider(), error = %e, "AI summary unavailable");
            AiSummary::Failed(ErrorValue::new(e.to_string()))
        }
    }
}

// A rejected news request surfaces only its reason, not the status line
fn news_error_message(err: &StockError) -> String {
    match err {
        StockError::ProviderRejected { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_llm::LLMError;

    fn unavailable() -> StockError {
        StockError::ProviderUnavailable {
            provider: "yahoo-finance",
            reason: "connection refused".to_string(),
        }
    }

    #[test]
    fn test_resolve_price() {
        assert_eq!(resolve_price(Ok(101.25)), RealTimePrice::Value(101.25));
        assert_eq!(resolve_price(Err(unavailable())), RealTimePrice::unavailable());
    }

    #[test]
    fn test_resolve_trend_error() {
        let trend = resolve_trend(Err(StockError::DataAbsent {
            symbol: "ZZZZ".to_string(),
            reason: "empty price series".to_string(),
        }));
        assert_eq!(
            trend,
            HistoricalTrend::Failed(ErrorValue::new(
                "Data not available for ZZZZ: empty price series"
            ))
        );
    }

    #[test]
    fn test_resolve_news() {
        let news = resolve_news(Ok(vec!["a".to_string()]));
        assert_eq!(news.headlines(), ["a".to_string()]);

        let news = resolve_news(Err(StockError::ProviderRejected {
            provider: "newsapi",
            status: 426,
            reason: "Failed to fetch news".to_string(),
        }));
        assert_eq!(news, LatestNews::Failed(ErrorValue::new("Failed to fetch news")));

        let news = resolve_news(Err(StockError::ProviderUnavailable {
            provider: "newsapi",
            reason: "timed out".to_string(),
        }));
        assert_eq!(news, LatestNews::Failed(ErrorValue::new("newsapi unavailable: timed out")));
    }

    #[test]
    fn test_resolve_summary() {
        assert_eq!(resolve_summary(Ok("ok".to_string())).text(), Some("ok"));

        let summary = resolve_summary(Err(LLMError::ModelLoading("warming up".to_string()).into()));
        assert!(summary.text().is_none());
        assert!(matches!(summary, AiSummary::Failed(e) if e.error.contains("warming up")));
    }
}
