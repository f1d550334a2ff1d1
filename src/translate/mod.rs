use async_trait::async_trait;

pub mod huggingface;

pub use huggingface::HuggingFaceTranslator;

use crate::Result;

/// Trait for machine translation backends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate one piece of text that fits the backend's input limit
    async fn translate(&self, text: &str) -> Result<String>;

    /// Get the name of this backend
    fn name(&self) -> &'static str;
}
