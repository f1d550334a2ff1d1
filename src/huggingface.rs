//! Minimal client for the hosted Hugging Face Inference API.

use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::Result;

/// Public inference endpoint
pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Optional access token; anonymous calls are rate limited but allowed
pub const TOKEN_ENV: &str = "HF_API_TOKEN";

#[derive(Debug, Deserialize)]
struct InferenceError {
    error: String,
}

/// Shared HTTP plumbing for the summarization and translation backends
#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl InferenceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: std::env::var(TOKEN_ENV).ok().filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn model_url(&self, model: &str) -> String {
        format!("{}/models/{}", self.base_url, model)
    }

    /// POST `body` to a model and return the first element of the result array
    pub async fn call(&self, model: &str, body: &Value) -> Result<Value> {
        let url = self.model_url(model);
        tracing::debug!("Calling inference model: {}", url);

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach inference API for {}", model))?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            anyhow::bail!(
                "Inference API error for {} (HTTP {}): {}",
                model,
                status,
                error_message(&text)
            );
        }

        let parsed: Value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse inference response for {}", model))?;

        first_result(parsed)
            .with_context(|| format!("Empty inference response for {}", model))
    }
}

/// The `error` field of an error body, or the raw body when it has none
fn error_message(body: &str) -> String {
    match serde_json::from_str::<InferenceError>(body) {
        Ok(e) => e.error,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

fn first_result(value: Value) -> Option<Value> {
    match value {
        Value::Array(mut items) if !items.is_empty() => Some(items.swap_remove(0)),
        Value::Array(_) => None,
        other => Some(other),
    }
}

/// Read a string field from an inference result
pub fn text_field(result: &Value, field: &str) -> Result<String> {
    result[field]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Inference response is missing '{}'", field))
}
