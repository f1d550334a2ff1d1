//! Splitting long text for length-limited models and recombining the results.
//!
//! Translation works on fixed-size character slices. Summarization works on
//! word-bounded chunks whose summaries are joined and, when the joined text is
//! still too long, summarized again.

use crate::summarize::Summarizer;
use crate::translate::Translator;
use crate::Result;

/// Largest slice sent to the translation backend in one request
pub const DEFAULT_TRANSLATION_CHARS: usize = 4999;

/// Words per summarization chunk
pub const DEFAULT_CHUNK_WORDS: usize = 500;

/// Overall word budget for a finished summary
pub const DEFAULT_SUMMARY_MAX_LENGTH: usize = 130;

/// Lower bound for any per-chunk summary target
pub const MIN_SUMMARY_LENGTH: usize = 30;

/// Upper bound for any per-chunk summary target
pub const MAX_SUMMARY_LENGTH: usize = 150;

/// Number of whitespace-delimited words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split `text` into slices of at most `max_chars` characters.
///
/// Slices never split a code point and concatenate back to `text` exactly.
pub fn chunk_chars(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let end = rest
            .char_indices()
            .nth(max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(end);
        chunks.push(head);
        rest = tail;
    }

    chunks
}

/// Group whitespace-delimited words into chunks of at most `max_words`
pub fn chunk_words(text: &str, max_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(max_words.max(1))
        .map(|chunk| chunk.join(" "))
        .collect()
}

/// Length bounds handed to the summarization model for one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryTarget {
    pub max_length: usize,
    pub min_length: usize,
}

impl SummaryTarget {
    /// Derive the target for a chunk of `words` words.
    ///
    /// Returns `None` when no target can be both `>= 30` and `< words`; such
    /// a chunk is already shorter than any summary the model may produce.
    pub fn for_chunk(words: usize) -> Option<Self> {
        let mut max_length = (words / 2).clamp(MIN_SUMMARY_LENGTH, MAX_SUMMARY_LENGTH);
        if max_length >= words {
            max_length = MIN_SUMMARY_LENGTH.max(words.saturating_sub(1));
        }
        if max_length >= words {
            return None;
        }

        Some(Self {
            max_length,
            min_length: MIN_SUMMARY_LENGTH.min(max_length),
        })
    }
}

/// Options for [`summarize_recursive`]
#[derive(Debug, Clone, Copy)]
pub struct SummaryOptions {
    pub chunk_words: usize,
    pub max_length: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            chunk_words: DEFAULT_CHUNK_WORDS,
            max_length: DEFAULT_SUMMARY_MAX_LENGTH,
        }
    }
}

/// Summarize each chunk, join with a space, and shrink again while too long.
///
/// Recursion stops once the combined text fits `max_length` words or a pass
/// fails to reduce the word count.
pub async fn summarize_recursive(
    summarizer: &dyn Summarizer,
    text: &str,
    options: SummaryOptions,
) -> Result<String> {
    let mut current = text.trim().to_string();
    let mut pass = 0;

    loop {
        pass += 1;
        let before = word_count(&current);
        if before == 0 {
            return Ok(String::new());
        }

        let chunks = chunk_words(&current, options.chunk_words);
        tracing::debug!(
            "Summarization pass {}: {} words in {} chunks",
            pass,
            before,
            chunks.len()
        );

        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let part = match SummaryTarget::for_chunk(word_count(chunk)) {
                Some(target) => {
                    summarizer
                        .summarize(chunk, target.max_length, target.min_length)
                        .await?
                }
                None => chunk.clone(),
            };
            parts.push(part.trim().to_string());
        }

        let combined = parts.join(" ");
        let after = word_count(&combined);

        if after <= options.max_length || after >= before {
            return Ok(combined);
        }

        current = combined;
    }
}

/// Options for [`translate_chunked`]
#[derive(Debug, Clone, Copy)]
pub struct TranslationOptions {
    pub max_chars: usize,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_TRANSLATION_CHARS,
        }
    }
}

/// Translate slice by slice, joining results in order with a single space
pub async fn translate_chunked(
    translator: &dyn Translator,
    text: &str,
    options: TranslationOptions,
) -> Result<String> {
    let chunks = chunk_chars(text, options.max_chars);
    let mut translated = Vec::with_capacity(chunks.len());

    for (index, chunk) in chunks.iter().enumerate() {
        tracing::debug!("Translating chunk {}/{}", index + 1, chunks.len());
        translated.push(translator.translate(chunk).await?);
    }

    Ok(translated.join(" ").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarize::MockSummarizer;
    use crate::translate::MockTranslator;

    #[test]
    fn test_chunk_chars_preserves_every_character() {
        let text = "The quick brown fox jumps over the lazy dog, très vite. 日本語も少し。";
        for limit in [1, 2, 3, 7, 16, 64, 1000] {
            let chunks = chunk_chars(text, limit);
            assert!(chunks.iter().all(|c| c.chars().count() <= limit));
            assert_eq!(chunks.concat(), text);
        }
    }

    #[test]
    fn test_chunk_chars_empty_input() {
        assert!(chunk_chars("", 4999).is_empty());
    }

    #[test]
    fn test_chunk_chars_short_input_is_single_chunk() {
        assert_eq!(chunk_chars("hello", 4999), vec!["hello"]);
    }

    #[test]
    fn test_chunk_words_groups_in_order() {
        let chunks = chunk_words("a b c d e", 2);
        assert_eq!(chunks, vec!["a b", "c d", "e"]);
        assert!(chunk_words("   ", 2).is_empty());
    }

    #[test]
    fn test_summary_target_bounds() {
        for words in 0..2000 {
            match SummaryTarget::for_chunk(words) {
                Some(target) => {
                    assert!(target.max_length >= MIN_SUMMARY_LENGTH, "words={}", words);
                    assert!(target.max_length < words, "words={}", words);
                    assert!(target.max_length <= MAX_SUMMARY_LENGTH);
                    assert!(target.min_length <= target.max_length);
                }
                None => assert!(words <= MIN_SUMMARY_LENGTH, "words={}", words),
            }
        }
    }

    #[test]
    fn test_summary_target_examples() {
        assert_eq!(SummaryTarget::for_chunk(31).map(|t| t.max_length), Some(30));
        assert_eq!(SummaryTarget::for_chunk(100).map(|t| t.max_length), Some(50));
        assert_eq!(SummaryTarget::for_chunk(1000).map(|t| t.max_length), Some(150));
        assert_eq!(SummaryTarget::for_chunk(30), None);
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[tokio::test]
    async fn test_summarize_empty_input_skips_model() {
        let mut summarizer = MockSummarizer::new();
        summarizer.expect_summarize().never();

        let result = summarize_recursive(&summarizer, "  ", SummaryOptions::default())
            .await
            .unwrap();
        assert_eq!(result, "");
    }

    #[tokio::test]
    async fn test_summarize_single_chunk_no_recursion() {
        let mut summarizer = MockSummarizer::new();
        summarizer
            .expect_summarize()
            .times(1)
            .withf(|_, max, min| *max == 50 && *min == 30)
            .returning(|_, _, _| Ok("short summary".to_string()));

        let result = summarize_recursive(&summarizer, &words(100), SummaryOptions::default())
            .await
            .unwrap();
        assert_eq!(result, "short summary");
    }

    #[tokio::test]
    async fn test_summarize_joins_chunks_and_recurses() {
        let mut summarizer = MockSummarizer::new();
        // Pass one: two 100-word chunks shrink to 70 words each (140 > 130).
        // Pass two: chunks of 100 and 40 words shrink to three words in total.
        let mut calls = 0;
        summarizer
            .expect_summarize()
            .times(4)
            .returning(move |_, _, _| {
                calls += 1;
                Ok(match calls {
                    1 | 2 => words(70),
                    3 => "alpha beta".to_string(),
                    _ => "gamma".to_string(),
                })
            });

        let options = SummaryOptions {
            chunk_words: 100,
            max_length: 130,
        };
        let result = summarize_recursive(&summarizer, &words(200), options)
            .await
            .unwrap();
        assert_eq!(result, "alpha beta gamma");
    }

    #[tokio::test]
    async fn test_summarize_stops_when_no_reduction() {
        let mut summarizer = MockSummarizer::new();
        summarizer
            .expect_summarize()
            .times(1)
            .returning(|text, _, _| Ok(text.to_string()));

        let options = SummaryOptions {
            chunk_words: 500,
            max_length: 10,
        };
        let input = words(200);
        let result = summarize_recursive(&summarizer, &input, options).await.unwrap();
        assert_eq!(result, input);
    }

    #[tokio::test]
    async fn test_short_text_passes_through() {
        let mut summarizer = MockSummarizer::new();
        summarizer.expect_summarize().never();

        let result = summarize_recursive(
            &summarizer,
            "Hello world. Hello again.",
            SummaryOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(result, "Hello world. Hello again.");
    }

    #[tokio::test]
    async fn test_translate_chunked_joins_in_order() {
        let mut translator = MockTranslator::new();
        translator
            .expect_translate()
            .times(3)
            .returning(|text| Ok(text.to_uppercase()));

        let result = translate_chunked(&translator, "abcdefgh", TranslationOptions { max_chars: 3 })
            .await
            .unwrap();
        assert_eq!(result, "ABC DEF GH");
    }

    #[tokio::test]
    async fn test_translate_empty_input() {
        let mut translator = MockTranslator::new();
        translator.expect_translate().never();

        let result = translate_chunked(&translator, "", TranslationOptions::default())
            .await
            .unwrap();
        assert_eq!(result, "");
    }
}
