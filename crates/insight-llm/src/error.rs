//! Error types for model calls

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LLMError>;

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("Model endpoint rejected the API key")]
    Unauthorized,

    #[error("Rate limited by model endpoint: {0}")]
    RateLimited(String),

    #[error("Model endpoint refused the request: {0}")]
    BadRequest(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Hosted inference returns 503 while a cold model warms up
    #[error("Model is loading: {0}")]
    ModelLoading(String),

    #[error("Model endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[cfg(any(feature = "huggingface", feature = "openai"))]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),
}

impl LLMError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: String, model: &str) -> Self {
        match status {
            401 | 403 => Self::Unauthorized,
            429 => Self::RateLimited(body),
            400 | 422 => Self::BadRequest(body),
            404 => Self::ModelNotFound(model.to_string()),
            503 => Self::ModelLoading(body),
            status => Self::Status { status, body },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            LLMError::from_status(403, String::new(), "m"),
            LLMError::Unauthorized
        ));
        assert!(matches!(
            LLMError::from_status(429, "slow down".into(), "m"),
            LLMError::RateLimited(body) if body == "slow down"
        ));
        assert!(matches!(
            LLMError::from_status(422, "bad inputs".into(), "m"),
            LLMError::BadRequest(_)
        ));
        assert!(matches!(
            LLMError::from_status(404, String::new(), "mixtral"),
            LLMError::ModelNotFound(model) if model == "mixtral"
        ));
        assert!(matches!(
            LLMError::from_status(503, String::new(), "m"),
            LLMError::ModelLoading(_)
        ));
    }

    #[test]
    fn test_unclassified_status_keeps_body() {
        let err = LLMError::from_status(500, "boom".into(), "m");
        assert_eq!(err.to_string(), "Model endpoint returned HTTP 500: boom");
    }
}
