//! Configuration for the insight orchestrator and its provider clients

use crate::conversation::DEFAULT_HISTORY_CAPACITY;
use crate::error::{Result, StockError};
use insight_llm::providers::huggingface::DEFAULT_HF_MODEL;
use insight_utils::EnvSource;
use std::str::FromStr;
use std::time::Duration;

/// Default NewsAPI base URL
pub const DEFAULT_NEWS_API_BASE: &str = "https://newsapi.org/v2";

/// Hosted language model backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LlmBackend {
    /// Hugging Face Inference API text generation (default)
    #[default]
    HuggingFace,
    /// OpenAI-compatible chat completions
    OpenAI,
}

impl FromStr for LlmBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "openai" => Ok(Self::OpenAI),
            other => Err(format!("unknown LLM provider '{other}'")),
        }
    }
}

/// Configuration for insight requests
#[derive(Debug, Clone, PartialEq)]
pub struct InsightConfig {
    /// NewsAPI key (not validated; an empty key surfaces as a provider failure)
    pub news_api_key: String,

    /// NewsAPI base URL
    pub news_api_base: String,

    /// Language model backend
    pub llm_backend: LlmBackend,

    /// Model identifier passed to the backend
    pub llm_model: String,

    /// Language model API key (not validated)
    pub llm_api_key: String,

    /// Override for the backend's base URL
    pub llm_api_base: Option<String>,

    /// Request timeout for the language model client
    pub llm_timeout: Duration,

    /// Upper bound on generated tokens
    pub max_new_tokens: usize,

    /// Number of headlines kept from the news provider
    pub max_headlines: usize,

    /// Conversation history capacity in messages (0 = unbounded)
    pub history_capacity: usize,

    /// Request timeout for market and news clients
    pub request_timeout: Duration,

    /// Chart raster size in pixels
    pub chart_width: u32,
    pub chart_height: u32,

    /// Moving-average overlay period (0 disables it)
    pub chart_sma_period: usize,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            news_api_key: String::new(),
            news_api_base: DEFAULT_NEWS_API_BASE.to_string(),
            llm_backend: LlmBackend::HuggingFace,
            llm_model: DEFAULT_HF_MODEL.to_string(),
            llm_api_key: String::new(),
            llm_api_base: None,
            llm_timeout: Duration::from_secs(120),
            max_new_tokens: 250,
            max_headlines: 5,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            request_timeout: Duration::from_secs(30),
            chart_width: 1000,
            chart_height: 500,
            chart_sma_period: 20,
        }
    }
}

impl InsightConfig {
    /// Create a new configuration builder
    pub fn builder() -> InsightConfigBuilder {
        InsightConfigBuilder::default()
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_source(&EnvSource::process())
    }

    /// Load configuration from an arbitrary key/value source
    pub fn from_source(env: &EnvSource) -> Result<Self> {
        let defaults = Self::default();

        let llm_backend = match env.get("LLM_PROVIDER") {
            Some(raw) => raw.parse::<LlmBackend>().map_err(StockError::Config)?,
            None => defaults.llm_backend,
        };

        let config = Self {
            news_api_key: env.get("NEWS_API_KEY").unwrap_or_default(),
            news_api_base: env.string_or("NEWS_API_BASE", &defaults.news_api_base),
            llm_backend,
            llm_model: env.string_or("LLM_MODEL", &defaults.llm_model),
            llm_api_key: env
                .first_of(&["Hugging_API_KEY", "HUGGING_API_KEY", "LLM_API_KEY"])
                .unwrap_or_default(),
            llm_api_base: env.get("LLM_API_BASE"),
            llm_timeout: Duration::from_secs(
                env.parse_or("LLM_TIMEOUT_SECS", defaults.llm_timeout.as_secs())?,
            ),
            max_new_tokens: env.parse_or("MAX_NEW_TOKENS", defaults.max_new_tokens)?,
            max_headlines: env.parse_or("MAX_HEADLINES", defaults.max_headlines)?,
            history_capacity: env.parse_or("HISTORY_CAPACITY", defaults.history_capacity)?,
            request_timeout: Duration::from_secs(
                env.parse_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout.as_secs())?,
            ),
            chart_width: defaults.chart_width,
            chart_height: defaults.chart_height,
            chart_sma_period: env.parse_or("CHART_SMA_PERIOD", defaults.chart_sma_period)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_new_tokens == 0 {
            return Err(StockError::Config(
                "max_new_tokens must be greater than 0".to_string(),
            ));
        }

        if self.max_headlines == 0 {
            return Err(StockError::Config(
                "max_headlines must be greater than 0".to_string(),
            ));
        }

        // History grows by user/bot pairs; an odd bound would split one on eviction
        if self.history_capacity % 2 != 0 {
            return Err(StockError::Config(format!(
                "history_capacity must be even, got {}",
                self.history_capacity
            )));
        }

        if self.chart_width < 100 || self.chart_height < 100 {
            return Err(StockError::Config(format!(
                "chart size {}x{} is too small",
                self.chart_width, self.chart_height
            )));
        }

        Ok(())
    }
}

/// Builder for InsightConfig
#[derive(Debug, Default)]
pub struct InsightConfigBuilder {
    news_api_key: Option<String>,
    news_api_base: Option<String>,
    llm_backend: Option<LlmBackend>,
    llm_model: Option<String>,
    llm_api_key: Option<String>,
    llm_api_base: Option<String>,
    max_new_tokens: Option<usize>,
    max_headlines: Option<usize>,
    history_capacity: Option<usize>,
    request_timeout: Option<Duration>,
    chart_sma_period: Option<usize>,
}

impl InsightConfigBuilder {
    /// Set the NewsAPI key
    pub fn news_api_key(mut self, key: impl Into<String>) -> Self {
        self.news_api_key = Some(key.into());
        self
    }

    /// Set the NewsAPI base URL
    pub fn news_api_base(mut self, base: impl Into<String>) -> Self {
        self.news_api_base = Some(base.into());
        self
    }

    /// Set the language model backend
    pub fn llm_backend(mut self, backend: LlmBackend) -> Self {
        self.llm_backend = Some(backend);
        self
    }

    /// Set the model identifier
    pub fn llm_model(mut self, model: impl Into<String>) -> Self {
        self.llm_model = Some(model.into());
        self
    }

    /// Set the language model API key
    pub fn llm_api_key(mut self, key: impl Into<String>) -> Self {
        self.llm_api_key = Some(key.into());
        self
    }

    /// Set the language model base URL
    pub fn llm_api_base(mut self, base: impl Into<String>) -> Self {
        self.llm_api_base = Some(base.into());
        self
    }

    /// Set the generated-token bound
    pub fn max_new_tokens(mut self, tokens: usize) -> Self {
        self.max_new_tokens = Some(tokens);
        self
    }

    /// Set how many headlines are kept
    pub fn max_headlines(mut self, count: usize) -> Self {
        self.max_headlines = Some(count);
        self
    }

    /// Set the conversation history capacity
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = Some(capacity);
        self
    }

    /// Set the market/news request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the moving-average overlay period
    pub fn chart_sma_period(mut self, period: usize) -> Self {
        self.chart_sma_period = Some(period);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<InsightConfig> {
        let defaults = InsightConfig::default();

        let config = InsightConfig {
            news_api_key: self.news_api_key.unwrap_or(defaults.news_api_key),
            news_api_base: self.news_api_base.unwrap_or(defaults.news_api_base),
            llm_backend: self.llm_backend.unwrap_or(defaults.llm_backend),
            llm_model: self.llm_model.unwrap_or(defaults.llm_model),
            llm_api_key: self.llm_api_key.unwrap_or(defaults.llm_api_key),
            llm_api_base: self.llm_api_base.or(defaults.llm_api_base),
            llm_timeout: defaults.llm_timeout,
            max_new_tokens: self.max_new_tokens.unwrap_or(defaults.max_new_tokens),
            max_headlines: self.max_headlines.unwrap_or(defaults.max_headlines),
            history_capacity: self.history_capacity.unwrap_or(defaults.history_capacity),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            chart_width: defaults.chart_width,
            chart_height: defaults.chart_height,
            chart_sma_period: self.chart_sma_period.unwrap_or(defaults.chart_sma_period),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InsightConfig::default();
        assert_eq!(config.llm_backend, LlmBackend::HuggingFace);
        assert_eq!(config.llm_model, "mistralai/Mixtral-8x7B-Instruct-v0.1");
        assert_eq!(config.max_new_tokens, 250);
        assert_eq!(config.max_headlines, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = InsightConfig::builder()
            .max_headlines(3)
            .history_capacity(0)
            .request_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(config.max_headlines, 3);
        assert_eq!(config.history_capacity, 0);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_validation_zero_tokens() {
        let result = InsightConfig::builder().max_new_tokens(0).build();
        assert!(matches!(result, Err(StockError::Config(_))));
    }

    #[test]
    fn test_validation_odd_history_capacity() {
        let result = InsightConfig::builder().history_capacity(5).build();
        assert!(matches!(result, Err(StockError::Config(msg)) if msg.contains("even")));

        let env = EnvSource::from_pairs([("HISTORY_CAPACITY", "199")]);
        assert!(InsightConfig::from_source(&env).is_err());

        assert!(InsightConfig::builder().history_capacity(4).build().is_ok());
    }

    #[test]
    fn test_from_source_reads_secrets_without_validating_them() {
        let env = EnvSource::from_pairs([
            ("NEWS_API_KEY", "news-secret"),
            ("Hugging_API_KEY", "hf-secret"),
            ("MAX_HEADLINES", "7"),
            ("LLM_PROVIDER", "openai"),
        ]);
        let config = InsightConfig::from_source(&env).unwrap();

        assert_eq!(config.news_api_key, "news-secret");
        assert_eq!(config.llm_api_key, "hf-secret");
        assert_eq!(config.max_headlines, 7);
        assert_eq!(config.llm_backend, LlmBackend::OpenAI);

        let no_vars = EnvSource::from_pairs(Vec::<(String, String)>::new());
        let empty = InsightConfig::from_source(&no_vars).unwrap();
        assert!(empty.news_api_key.is_empty());
        assert!(empty.llm_api_key.is_empty());
    }

    #[test]
    fn test_from_source_rejects_bad_numbers() {
        let env = EnvSource::from_pairs([("HISTORY_CAPACITY", "lots")]);
        let err = InsightConfig::from_source(&env).unwrap_err();
        assert!(err.to_string().contains("HISTORY_CAPACITY"));

        let env = EnvSource::from_pairs([("LLM_PROVIDER", "carrier-pigeon")]);
        assert!(InsightConfig::from_source(&env).is_err());
    }
}
