//! Error types for stock insight operations

use insight_llm::LLMError;
use insight_utils::ConfigError;
use thiserror::Error;

/// Stock insight specific errors
#[derive(Debug, Error)]
pub enum StockError {
    /// Provider could not be reached (network, transport, malformed body)
    #[error("{provider} unavailable: {reason}")]
    ProviderUnavailable {
        provider: &'static str,
        reason: String,
    },

    /// Provider answered with a non-success status
    #[error("{provider} rejected the request ({status}): {reason}")]
    ProviderRejected {
        provider: &'static str,
        status: u16,
        reason: String,
    },

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataAbsent {
        symbol: String,
        reason: String,
    },

    /// Language model call failed
    #[error("Language model error: {0}")]
    Llm(#[from] LLMError),

    /// Chart rendering or encoding failed
    #[error("Chart error: {0}")]
    Chart(String),

    /// Prompt template failed to compile or render
    #[error("Prompt template error: {0}")]
    Prompt(#[from] minijinja::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StockError {
    /// Name of the collaborator the error came from, for logs
    pub fn provider(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable { provider, .. }
            | Self::ProviderRejected { provider, .. } => *provider,
            Self::DataAbsent { .. } => "market-data",
            Self::Llm(_) => "language-model",
            Self::Chart(_) => "chart",
            Self::Prompt(_) => "prompt",
            Self::Config(_) => "config",
        }
    }
}

impl From<ConfigError> for StockError {
    fn from(err: ConfigError) -> Self {
        StockError::Config(err.to_string())
    }
}

/// Result type alias for stock operations
pub type Result<T> = std::result::Result<T, StockError>;
