use async_trait::async_trait;
use serde_json::json;

use super::Translator;
use crate::huggingface::{text_field, InferenceClient};
use crate::Result;

/// Model name template; `{source}` and `{target}` are language codes
pub const DEFAULT_MODEL_TEMPLATE: &str = "Helsinki-NLP/opus-mt-{source}-{target}";

/// Translator backed by a hosted MarianMT model
pub struct HuggingFaceTranslator {
    client: InferenceClient,
    model: String,
}

impl HuggingFaceTranslator {
    pub fn new(client: InferenceClient, source_lang: &str, target_lang: &str) -> Self {
        Self::with_template(client, DEFAULT_MODEL_TEMPLATE, source_lang, target_lang)
    }

    pub fn with_template(
        client: InferenceClient,
        template: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Self {
        Self {
            client,
            model: model_name(template, source_lang, target_lang),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Fill the language codes into a model name template
pub fn model_name(template: &str, source_lang: &str, target_lang: &str) -> String {
    template
        .replace("{source}", &source_lang.to_lowercase())
        .replace("{target}", &target_lang.to_lowercase())
}

#[async_trait]
impl Translator for HuggingFaceTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        let result = self.client.call(&self.model, &json!({ "inputs": text })).await?;
        text_field(&result, "translation_text")
    }

    fn name(&self) -> &'static str {
        "Hugging Face translation"
    }
}
