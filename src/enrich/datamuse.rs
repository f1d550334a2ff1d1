use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

use super::{Lexicon, PartOfSpeech, PosTagger};
use crate::Result;

pub const DEFAULT_BASE_URL: &str = "https://api.datamuse.com";

#[derive(Debug, Deserialize)]
struct WordEntry {
    word: String,
    #[serde(default)]
    tags: Vec<String>,
}

/// Datamuse word-finding API, used both as tagger and as synonym source
pub struct Datamuse {
    client: Client,
    base_url: String,
}

impl Datamuse {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn words(&self, query: &str) -> Result<Vec<WordEntry>> {
        let url = format!("{}/words?{}", self.base_url, query);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to query {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Datamuse request failed: HTTP {}", response.status());
        }

        Ok(response.json().await?)
    }

    async fn lookup_tag(&self, word: &str) -> Result<PartOfSpeech> {
        let query = format!("sp={}&md=p&max=1", urlencoding::encode(word));
        let entries = self.words(&query).await?;
        Ok(entries
            .first()
            .filter(|entry| entry.word.eq_ignore_ascii_case(word))
            .map(|entry| primary_tag(&entry.tags))
            .unwrap_or(PartOfSpeech::Other))
    }
}

/// First part-of-speech tag in a Datamuse tag list
fn primary_tag(tags: &[String]) -> PartOfSpeech {
    tags.iter()
        .map(|t| PartOfSpeech::from_tag(t))
        .find(|pos| *pos != PartOfSpeech::Other)
        .unwrap_or(PartOfSpeech::Other)
}

fn is_word(token: &str) -> bool {
    token.chars().any(|c| c.is_alphabetic())
}

#[async_trait]
impl PosTagger for Datamuse {
    async fn tag(&self, tokens: &[String]) -> Result<Vec<PartOfSpeech>> {
        let mut seen: HashMap<String, PartOfSpeech> = HashMap::new();
        let mut tags = Vec::with_capacity(tokens.len());

        for token in tokens {
            if !is_word(token) {
                tags.push(PartOfSpeech::Other);
                continue;
            }

            let key = token.to_lowercase();
            if let Some(pos) = seen.get(&key) {
                tags.push(*pos);
                continue;
            }

            let pos = match self.lookup_tag(&key).await {
                Ok(pos) => pos,
                Err(e) => {
                    tracing::warn!("Part-of-speech lookup failed for '{}': {}", token, e);
                    PartOfSpeech::Other
                }
            };
            seen.insert(key, pos);
            tags.push(pos);
        }

        Ok(tags)
    }
}

#[async_trait]
impl Lexicon for Datamuse {
    async fn synonyms(&self, word: &str) -> Result<Vec<String>> {
        let query = format!("rel_syn={}", urlencoding::encode(&word.to_lowercase()));
        let entries = self.words(&query).await?;
        Ok(entries.into_iter().map(|entry| entry.word).collect())
    }
}
