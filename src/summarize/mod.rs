use async_trait::async_trait;

pub mod huggingface;

pub use huggingface::HuggingFaceSummarizer;

use crate::Result;

/// Trait for abstractive summarization backends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `text` into roughly `min_length..=max_length` tokens
    async fn summarize(&self, text: &str, max_length: usize, min_length: usize) -> Result<String>;

    /// Get the name of this backend
    fn name(&self) -> &'static str;
}
