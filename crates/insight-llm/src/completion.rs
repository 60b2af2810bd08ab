//! Completion request and response types

use crate::Message;
use serde::{Deserialize, Serialize};

/// Generation bound used when a request does not set one
pub const DEFAULT_MAX_TOKENS: usize = 250;

/// A single generation request
///
/// Built with consuming `with_*` setters:
///
/// ```
/// use insight_llm::{CompletionRequest, Message};
///
/// let request = CompletionRequest::new("mistralai/Mixtral-8x7B-Instruct-v0.1")
///     .with_message(Message::user("Summarize AAPL"))
///     .with_max_tokens(128);
/// assert_eq!(request.flattened_prompt(), "Summarize AAPL");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Provider-specific model id
    pub model: String,

    pub messages: Vec<Message>,

    /// Upper bound on generated tokens
    pub max_tokens: usize,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Collapse the messages into one text-generation input, separated by blank lines
    pub fn flattened_prompt(&self) -> String {
        self.messages
            .iter()
            .map(Message::text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Generated output plus whatever metadata the provider reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub message: Message,

    pub stop_reason: StopReason,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    pub fn text(&self) -> &str {
        self.message.text()
    }
}

/// Why generation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    /// Text-generation endpoints do not report one
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}
