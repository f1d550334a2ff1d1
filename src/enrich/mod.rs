//! Lexical enrichment: annotate nouns with a synonym.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

pub mod datamuse;

pub use datamuse::Datamuse;

use crate::Result;

/// Coarse part-of-speech classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartOfSpeech {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Other,
}

impl PartOfSpeech {
    /// Map a tag to a class.
    ///
    /// Accepts both Penn Treebank tags (`NN`, `NNS`, `VBZ`, ...) and the short
    /// lexical-database tags (`n`, `v`, `adj`, `adv`).
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "n" => PartOfSpeech::Noun,
            "v" => PartOfSpeech::Verb,
            "adj" => PartOfSpeech::Adjective,
            "adv" => PartOfSpeech::Adverb,
            t if t.starts_with("NN") => PartOfSpeech::Noun,
            t if t.starts_with("VB") => PartOfSpeech::Verb,
            t if t.starts_with("JJ") => PartOfSpeech::Adjective,
            t if t.starts_with("RB") => PartOfSpeech::Adverb,
            _ => PartOfSpeech::Other,
        }
    }
}

/// Assigns a part of speech to each token
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PosTagger: Send + Sync {
    /// Returns one tag per input token, in the same order
    async fn tag(&self, tokens: &[String]) -> Result<Vec<PartOfSpeech>>;
}

/// Looks up synonyms in a lexical database
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Lexicon: Send + Sync {
    /// Synonyms in the database's own order
    async fn synonyms(&self, word: &str) -> Result<Vec<String>>;
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        Regex::new(r"\w+(?:['’]\w+)*|[^\w\s]").expect("token pattern is valid")
    })
}

/// Split text into word and punctuation tokens, preserving order
pub fn tokenize(text: &str) -> Vec<String> {
    token_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// First synonym that differs from `word`, with underscores read as spaces
pub fn first_distinct_synonym(word: &str, synonyms: &[String]) -> Option<String> {
    synonyms
        .iter()
        .map(|s| s.replace('_', " "))
        .find(|s| !s.trim().is_empty() && !s.eq_ignore_ascii_case(word))
}

/// Appends `(synonym: X)` after each noun that has a distinct synonym
pub struct Enricher {
    tagger: Box<dyn PosTagger>,
    lexicon: Box<dyn Lexicon>,
}

impl Enricher {
    pub fn new(tagger: Box<dyn PosTagger>, lexicon: Box<dyn Lexicon>) -> Self {
        Self { tagger, lexicon }
    }

    pub async fn enrich(&self, text: &str) -> Result<String> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Ok(String::new());
        }

        let tags = self.tagger.tag(&tokens).await?;
        if tags.len() != tokens.len() {
            anyhow::bail!(
                "Tagger returned {} tags for {} tokens",
                tags.len(),
                tokens.len()
            );
        }

        let mut enriched = Vec::with_capacity(tokens.len());
        for (token, tag) in tokens.iter().zip(tags) {
            enriched.push(token.clone());

            if tag != PartOfSpeech::Noun {
                continue;
            }

            match self.lexicon.synonyms(token).await {
                Ok(synonyms) => {
                    if let Some(synonym) = first_distinct_synonym(token, &synonyms) {
                        enriched.push(format!("(synonym: {})", synonym));
                    }
                }
                Err(e) => tracing::warn!("Synonym lookup failed for '{}': {}", token, e),
            }
        }

        Ok(enriched.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_splits_punctuation() {
        assert_eq!(
            tokenize("Don't stop, the test works."),
            vec!["Don't", "stop", ",", "the", "test", "works", "."]
        );
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_from_tag() {
        assert_eq!(PartOfSpeech::from_tag("NN"), PartOfSpeech::Noun);
        assert_eq!(PartOfSpeech::from_tag("NNPS"), PartOfSpeech::Noun);
        assert_eq!(PartOfSpeech::from_tag("n"), PartOfSpeech::Noun);
        assert_eq!(PartOfSpeech::from_tag("VBZ"), PartOfSpeech::Verb);
        assert_eq!(PartOfSpeech::from_tag("DT"), PartOfSpeech::Other);
    }

    #[test]
    fn test_first_distinct_synonym_skips_self() {
        let synonyms = vec!["test".to_string(), "Test".to_string(), "trial_run".to_string()];
        assert_eq!(
            first_distinct_synonym("test", &synonyms),
            Some("trial run".to_string())
        );
        assert_eq!(first_distinct_synonym("test", &["test".to_string()]), None);
    }

    fn tagger_marking_nouns(nouns: &'static [&'static str]) -> MockPosTagger {
        let mut tagger = MockPosTagger::new();
        tagger.expect_tag().returning(move |tokens| {
            Ok(tokens
                .iter()
                .map(|t| {
                    if nouns.contains(&t.as_str()) {
                        PartOfSpeech::Noun
                    } else {
                        PartOfSpeech::Other
                    }
                })
                .collect())
        });
        tagger
    }

    #[tokio::test]
    async fn test_enrich_appends_synonym_after_noun() {
        let mut lexicon = MockLexicon::new();
        lexicon
            .expect_synonyms()
            .withf(|word| word == "test")
            .times(1)
            .returning(|_| Ok(vec!["exam".to_string()]));

        let enricher = Enricher::new(Box::new(tagger_marking_nouns(&["test"])), Box::new(lexicon));
        let result = enricher.enrich("This is a test").await.unwrap();
        assert_eq!(result, "This is a test (synonym: exam)");
    }

    #[tokio::test]
    async fn test_noun_without_distinct_synonym_is_unannotated() {
        let mut lexicon = MockLexicon::new();
        lexicon
            .expect_synonyms()
            .returning(|word| Ok(vec![word.to_string()]));

        let enricher = Enricher::new(Box::new(tagger_marking_nouns(&["cat"])), Box::new(lexicon));
        let result = enricher.enrich("the cat sat").await.unwrap();
        assert_eq!(result, "the cat sat");
    }

    #[tokio::test]
    async fn test_lookup_failure_leaves_token() {
        let mut lexicon = MockLexicon::new();
        lexicon
            .expect_synonyms()
            .returning(|_| Err(anyhow::anyhow!("offline")));

        let enricher = Enricher::new(Box::new(tagger_marking_nouns(&["dog"])), Box::new(lexicon));
        let result = enricher.enrich("a dog").await.unwrap();
        assert_eq!(result, "a dog");
    }

    #[tokio::test]
    async fn test_only_nouns_are_looked_up() {
        let mut lexicon = MockLexicon::new();
        lexicon
            .expect_synonyms()
            .times(2)
            .returning(|word| Ok(vec![format!("{}-syn", word)]));

        let enricher = Enricher::new(
            Box::new(tagger_marking_nouns(&["cats", "mice"])),
            Box::new(lexicon),
        );
        let result = enricher.enrich("cats chase mice.").await.unwrap();
        assert_eq!(
            result,
            "cats (synonym: cats-syn) chase mice (synonym: mice-syn) ."
        );
    }

    #[tokio::test]
    async fn test_empty_text() {
        let mut tagger = MockPosTagger::new();
        tagger.expect_tag().never();
        let mut lexicon = MockLexicon::new();
        lexicon.expect_synonyms().never();

        let enricher = Enricher::new(Box::new(tagger), Box::new(lexicon));
        assert_eq!(enricher.enrich("").await.unwrap(), "");
    }
}
