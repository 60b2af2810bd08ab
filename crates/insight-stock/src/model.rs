//! Request and response types for the "get insights" operation
//!
//! Response fields that depend on a provider carry either the value or an
//! in-band error object (`{"error": "..."}`), so a failing provider never
//! turns into a failed request.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::conversation::ChatMessage;

/// Placeholder shown when no real-time price could be fetched
pub const PRICE_PLACEHOLDER: &str = "N/A";

/// Lookback window for historical prices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl Timeframe {
    /// Every supported timeframe, shortest first
    pub const ALL: [Timeframe; 11] = [
        Self::OneDay,
        Self::FiveDays,
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::TwoYears,
        Self::FiveYears,
        Self::TenYears,
        Self::YearToDate,
        Self::Max,
    ];

    /// Wire representation (e.g. "1y")
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::FiveDays => "5d",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
            Self::TenYears => "10y",
            Self::YearToDate => "ytd",
            Self::Max => "max",
        }
    }

    /// Start of the window that ends at `end`
    pub fn start_from(&self, end: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::OneDay => end - Duration::days(1),
            Self::FiveDays => end - Duration::days(5),
            Self::OneMonth => end - Duration::days(30),
            Self::ThreeMonths => end - Duration::days(90),
            Self::SixMonths => end - Duration::days(180),
            Self::OneYear => end - Duration::days(365),
            Self::TwoYears => end - Duration::days(730),
            Self::FiveYears => end - Duration::days(1825),
            Self::TenYears => end - Duration::days(3650),
            Self::YearToDate => chrono::NaiveDate::from_ymd_opt(end.year(), 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map_or(end - Duration::days(365), |dt| dt.and_utc()),
            // ~100 years
            Self::Max => end - Duration::days(36500),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown timeframe '{s}'"))
    }
}

/// Inbound "get insights" request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuery {
    /// Ticker symbol, used as given
    pub symbol: String,
    /// History window for the trend chart
    #[serde(default)]
    pub timeframe: Timeframe,
    /// The user's free-text question
    pub user_message: String,
}

impl StockQuery {
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        user_message: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            user_message: user_message.into(),
        }
    }
}

/// A single close price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// News article as returned by the news provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    /// NewsAPI sends `null` for removed articles
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "publishedAt")]
    pub published_at: Option<String>,
}

/// In-band error object embedded in a response field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorValue {
    pub error: String,
}

impl ErrorValue {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Rendered as a JSON object, the same shape the client sees
        write!(f, "{{\"error\": {:?}}}", self.error)
    }
}

/// Real-time price or the "N/A" placeholder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RealTimePrice {
    Value(f64),
    Placeholder(String),
}

impl RealTimePrice {
    pub fn unavailable() -> Self {
        Self::Placeholder(PRICE_PLACEHOLDER.to_string())
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Placeholder(_) => None,
        }
    }
}

impl fmt::Display for RealTimePrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Placeholder(p) => f.write_str(p),
        }
    }
}

/// Rendered trend chart and the series behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendChart {
    /// Base64-encoded PNG
    pub trend_plot: String,
    /// Last close in the series
    pub latest_price: f64,
    pub series: Vec<PricePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoricalTrend {
    Chart(TrendChart),
    Failed(ErrorValue),
}

impl HistoricalTrend {
    pub fn chart(&self) -> Option<&TrendChart> {
        match self {
            Self::Chart(chart) => Some(chart),
            Self::Failed(_) => None,
        }
    }
}

/// Latest headlines, or the error that prevented fetching them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LatestNews {
    Headlines(Vec<String>),
    Failed(ErrorValue),
}

impl LatestNews {
    pub fn headlines(&self) -> &[String] {
        match self {
            Self::Headlines(h) => h,
            Self::Failed(_) => &[],
        }
    }
}

impl fmt::Display for LatestNews {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Headlines(h) => write!(f, "{h:?}"),
            Self::Failed(e) => e.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AiSummary {
    Text(String),
    Failed(ErrorValue),
}

impl AiSummary {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::Failed(_) => None,
        }
    }
}

/// Unified payload returned for every "get insights" request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightResponse {
    pub symbol: String,
    pub real_time_price: RealTimePrice,
    pub historical_trend: HistoricalTrend,
    pub latest_news: LatestNews,
    pub ai_summary: AiSummary,
    pub conversation_history: Vec<ChatMessage>,
}
