//! Hugging Face text-generation provider
//!
//! Calls the hosted Inference API for text-generation models.
//! See: https://huggingface.co/docs/api-inference/tasks/text-generation

use crate::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, Result, StopReason,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_HF_API_BASE: &str = "https://api-inference.huggingface.co";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default model used for insight summaries
pub const DEFAULT_HF_MODEL: &str = "mistralai/Mixtral-8x7B-Instruct-v0.1";

#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    /// Access token; may be empty, in which case the API rejects the call
    pub api_key: String,
    /// Inference API root, or a dedicated endpoint
    pub api_base: String,
    pub timeout: Duration,
}

impl HuggingFaceConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_HF_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct HuggingFaceProvider {
    client: Client,
    config: HuggingFaceConfig,
}

impl HuggingFaceProvider {
    pub fn with_config(config: HuggingFaceConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HuggingFaceConfig {
        &self.config
    }
}

#[async_trait]
impl LLMProvider for HuggingFaceProvider {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = TextGenerationRequest {
            inputs: request.flattened_prompt(),
            parameters: TextGenerationParameters {
                max_new_tokens: request.max_tokens,
                return_full_text: false,
            },
        };

        let url = format!("{}/models/{}", self.config.api_base, request.model);
        debug!("Sending text-generation request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await?;
            return Err(LLMError::from_status(status, error_text, &request.model));
        }

        let generations: Vec<Generation> = response.json().await.map_err(|e| {
            LLMError::MalformedResponse(format!("Failed to parse response: {e}"))
        })?;

        let generated = generations
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::MalformedResponse("No generations in response".to_string()))?
            .generated_text;

        debug!("Received {} characters of generated text", generated.len());

        Ok(CompletionResponse {
            message: Message::assistant(generated),
            stop_reason: StopReason::Unknown,
            usage: None,
        })
    }

    fn name(&self) -> &'static str {
        "huggingface"
    }
}

// Inference API request/response types

#[derive(Debug, Serialize)]
struct TextGenerationRequest {
    inputs: String,
    parameters: TextGenerationParameters,
}

#[derive(Debug, Serialize)]
struct TextGenerationParameters {
    max_new_tokens: usize,
    return_full_text: bool,
}

#[derive(Debug, Deserialize)]
struct Generation {
    generated_text: String,
}
