use super::{ChatCompletion, ChatMessage, ChatRequest};
use crate::config::ChatConfig;
use crate::extractors::SourceMetadata;
use crate::retry::RetryPolicy;
use crate::Result;

/// Structured video overview written by a chat model
pub struct RichSummary {
    chat: Box<dyn ChatCompletion>,
    policy: RetryPolicy,
    model: String,
    max_tokens: u32,
    temperature: f32,
    language: String,
}

impl RichSummary {
    pub fn new(chat: Box<dyn ChatCompletion>, config: &ChatConfig, policy: RetryPolicy) -> Self {
        Self {
            chat,
            policy,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            language: config.language.clone(),
        }
    }

    pub fn build_prompt(&self, metadata: &SourceMetadata) -> String {
        format!(
            r#"Write a detailed and engaging summary of the following YouTube video in {language}:

Title: {title}
Channel: {channel}
Description: {description}
Views: {views}
Likes: {likes}
Duration: {duration} seconds
Upload date: {upload_date}
Tags: {tags}

Include the following sections in Markdown:

1. ## Overview
   - A short description of the video content (2-3 sentences)

2. ## Key Points
   - The main topics discussed, as bullet points

3. ## Notable Moments
   - Important quotes or striking moments (use blockquotes for quotes)

4. ## Relevance
   - Why the video matters in its field or area of interest

5. ## Audience
   - Who would benefit most from watching and why

6. ## Debates (if applicable)
   - Points of discussion or controversy around the topic

7. ## Related Topics
   - Other videos or subjects viewers may find interesting

Keep it engaging and informative, around 400-500 words, using Markdown formatting for readability."#,
            language = self.language,
            title = metadata.display("title"),
            channel = metadata.display("channel"),
            description = metadata.display("description"),
            views = metadata.display("view_count"),
            likes = metadata.display("like_count"),
            duration = metadata.display("duration"),
            upload_date = metadata.display("upload_date"),
            tags = metadata.display("tags"),
        )
    }

    pub fn request(&self, metadata: &SourceMetadata) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(format!(
                    "You are an assistant that writes detailed, engaging summaries of YouTube videos in {}.",
                    self.language
                )),
                ChatMessage::user(self.build_prompt(metadata)),
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Generate the overview, retrying the chat call per the policy
    pub async fn generate(&self, metadata: &SourceMetadata) -> Result<String> {
        let request = self.request(metadata);
        let summary = self
            .policy
            .run("rich summary generation", || self.chat.complete(&request))
            .await?;
        Ok(summary.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::MockChatCompletion;
    use crate::StreamError;
    use std::time::Duration;

    fn metadata() -> SourceMetadata {
        SourceMetadata::new()
            .with("title", "Test Video")
            .with("channel", "Test Channel")
            .with("description", "Test description")
            .with("view_count", 1000)
            .with("like_count", 100)
            .with("duration", 300)
            .with("upload_date", "20230101")
            .with("tags", vec!["tag1", "tag2"])
    }

    fn instant() -> RetryPolicy {
        RetryPolicy::fixed(3, Duration::ZERO)
    }

    #[test]
    fn test_prompt_includes_metadata() {
        let summary = RichSummary::new(
            Box::new(MockChatCompletion::new()),
            &ChatConfig::default(),
            instant(),
        );
        let prompt = summary.build_prompt(&metadata());
        assert!(prompt.contains("Title: Test Video"));
        assert!(prompt.contains("Channel: Test Channel"));
        assert!(prompt.contains("Tags: tag1, tag2"));
        assert!(prompt.contains("Duration: 300 seconds"));
        assert!(prompt.contains("Brazilian Portuguese"));
    }

    #[tokio::test]
    async fn test_generate_returns_trimmed_text() {
        let mut chat = MockChatCompletion::new();
        chat.expect_complete()
            .times(1)
            .withf(|request| request.model == "gpt-4" && request.messages.len() == 2)
            .returning(|_| Ok("  Test summary \n".to_string()));

        let summary = RichSummary::new(Box::new(chat), &ChatConfig::default(), instant());
        assert_eq!(summary.generate(&metadata()).await.unwrap(), "Test summary");
    }

    #[tokio::test]
    async fn test_generate_retries_then_succeeds() {
        let mut chat = MockChatCompletion::new();
        let mut calls = 0;
        chat.expect_complete().times(3).returning(move |_| {
            calls += 1;
            if calls < 3 {
                Err(anyhow::anyhow!("rate limited"))
            } else {
                Ok("Overview".to_string())
            }
        });

        let summary = RichSummary::new(Box::new(chat), &ChatConfig::default(), instant());
        assert_eq!(summary.generate(&metadata()).await.unwrap(), "Overview");
    }

    #[tokio::test]
    async fn test_generate_exhausts() {
        let mut chat = MockChatCompletion::new();
        chat.expect_complete()
            .times(3)
            .returning(|_| Err(anyhow::anyhow!("server error")));

        let summary = RichSummary::new(Box::new(chat), &ChatConfig::default(), instant());
        let err = summary.generate(&metadata()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StreamError>(),
            Some(StreamError::RemoteCallExhausted { attempts: 3, .. })
        ));
    }
}
