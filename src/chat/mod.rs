use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod openai;
pub mod rich_summary;

pub use openai::OpenAiChat;
pub use rich_summary::RichSummary;

use crate::Result;

/// One message in a chat completion conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A single chat completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Trait for remote chat completion APIs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Send one request and return the text of the first choice, trimmed
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}
