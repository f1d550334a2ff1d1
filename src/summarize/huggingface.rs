use async_trait::async_trait;
use serde_json::json;

use super::Summarizer;
use crate::huggingface::{text_field, InferenceClient};
use crate::Result;

/// Default abstractive summarization model
pub const DEFAULT_MODEL: &str = "facebook/bart-large-cnn";

/// Summarizer backed by a hosted sequence-to-sequence model
pub struct HuggingFaceSummarizer {
    client: InferenceClient,
    model: String,
}

impl HuggingFaceSummarizer {
    pub fn new(client: InferenceClient) -> Self {
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Summarizer for HuggingFaceSummarizer {
    async fn summarize(&self, text: &str, max_length: usize, min_length: usize) -> Result<String> {
        let body = json!({
            "inputs": text,
            "parameters": {
                "max_length": max_length,
                "min_length": min_length,
                "do_sample": false,
            },
        });

        let result = self.client.call(&self.model, &body).await?;
        text_field(&result, "summary_text")
    }

    fn name(&self) -> &'static str {
        "Hugging Face summarization"
    }
}
