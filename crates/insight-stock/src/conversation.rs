//! Conversation history shared by every insight request
//!
//! The store is a single ordered log of role-tagged messages. Every request
//! appends to it and its rendering is replayed into each new prompt. There is
//! no per-session partitioning: all callers read and append to the same log.
//!
//! Capacity is bounded by default; once full, the oldest messages are evicted
//! first. A capacity of `0` keeps every message for the life of the process.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tokio::sync::RwLock;

use crate::model::{ErrorValue, LatestNews};

/// Default maximum number of messages retained
pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Bot,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("User"),
            Self::Bot => f.write_str("Bot"),
        }
    }
}

/// Message payload: free text, a headline list, or an in-band error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Headlines(Vec<String>),
    Error(ErrorValue),
}

impl fmt::Display for MessageContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(t) => f.write_str(t),
            Self::Headlines(h) => write!(f, "{h:?}"),
            Self::Error(e) => e.fmt(f),
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<&LatestNews> for MessageContent {
    fn from(news: &LatestNews) -> Self {
        match news {
            LatestNews::Headlines(h) => Self::Headlines(h.clone()),
            LatestNews::Failed(e) => Self::Error(e.clone()),
        }
    }
}

/// A single entry in the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn bot(content: impl Into<MessageContent>) -> Self {
        Self {
            role: ChatRole::Bot,
            content: content.into(),
        }
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.role, self.content)
    }
}

/// Process-wide conversation log guarded by an async read/write lock
#[derive(Debug)]
pub struct ConversationStore {
    messages: RwLock<VecDeque<ChatMessage>>,
    capacity: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ConversationStore {
    /// Create a store that keeps at most `capacity` messages (`0` = unbounded)
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: RwLock::new(VecDeque::new()),
            capacity,
        }
    }

    /// Create a store that never evicts
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Maximum number of retained messages, `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        (self.capacity > 0).then_some(self.capacity)
    }

    /// Append one message to the tail
    pub async fn append(&self, message: ChatMessage) {
        let mut messages = self.messages.write().await;
        messages.push_back(message);
        self.evict(&mut messages);
    }

    /// Append a user/bot pair under one lock so no other append lands between them
    pub async fn append_exchange(&self, user: ChatMessage, bot: ChatMessage) {
        let mut messages = self.messages.write().await;
        messages.push_back(user);
        messages.push_back(bot);
        self.evict(&mut messages);
    }

    /// Ordered copy of the log at call time
    pub async fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }

    /// Render the log as `"{role}: {content}"` lines for prompt context
    pub async fn format_for_prompt(&self) -> String {
        self.messages
            .read()
            .await
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn evict(&self, messages: &mut VecDeque<ChatMessage>) {
        if self.capacity == 0 {
            return;
        }
        while messages.len() > self.capacity {
            messages.pop_front();
        }
    }
}
