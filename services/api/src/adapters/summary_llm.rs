//! services/api/src/adapters/summary_llm.rs
//!
//! This module contains the adapter for the course-summarizing LLM.
//! It implements the `SummaryGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use course_assistant_core::ports::{PortError, PortResult, SummaryGenerationService};
use tracing::info;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes online courses.";
const MAX_SUMMARY_TOKENS: u32 = 150;
const TEMPERATURE: f32 = 0.7;

/// Builds the user turn sent to the model for a course description.
fn summary_prompt(description: &str) -> String {
    format!("Summarize this course: {}", description)
}

/// Trims the model output. A blank reply counts as a failed generation.
fn clean_summary(raw: &str) -> PortResult<String> {
    let summary = raw.trim();
    if summary.is_empty() {
        return Err(PortError::Unexpected(
            "Summary LLM returned an empty summary.".to_string(),
        ));
    }
    Ok(summary.to_string())
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `SummaryGenerationService` using an OpenAI chat model.
#[derive(Clone)]
pub struct OpenAiSummaryAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiSummaryAdapter {
    /// Creates a new `OpenAiSummaryAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `SummaryGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SummaryGenerationService for OpenAiSummaryAdapter {
    async fn summarize_course(&self, description: &str) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(summary_prompt(description))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(MAX_SUMMARY_TOKENS)
            .temperature(TEMPERATURE)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // No retry: a failed call surfaces to the caller as-is.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let summary = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected(
                    "Summary LLM response contained no text content.".to_string(),
                )
            })?;

        info!(model = %self.model, chars = summary.len(), "Course summary generated");
        clean_summary(&summary)
    }
}
