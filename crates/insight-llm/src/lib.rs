//! Language model provider abstraction for the stock insights service
//!
//! This crate provides provider-agnostic abstractions for calling hosted
//! large language models. It includes:
//!
//! - Message types for prompt assembly
//! - Completion request/response types
//! - Provider trait for LLM implementations
//! - Concrete provider implementations (behind feature flags)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;

// Re-export main types
pub use completion::{
    CompletionRequest, CompletionResponse, DEFAULT_MAX_TOKENS, StopReason, TokenUsage,
};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;

// Provider implementations (feature-gated)
#[cfg(any(feature = "huggingface", feature = "openai"))]
pub mod providers;
