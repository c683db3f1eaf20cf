//! Stateless augmentation operations over a [`TextProvider`].
//!
//! # Responsibility
//! - Build the prompts for summary, title/tag suggestion and contextual Q&A.
//! - Normalize provider output into typed results.
//!
//! # Invariants
//! - Provider failures surface as `AugmentationError::Failed`.
//! - A malformed title/tag payload resolves to [`TitleSuggestion::fallback`]
//!   and is never surfaced as an error.
//! - Exactly one provider call per operation; no retries.

use crate::ai::provider::{GenerationRequest, ProviderError, TextProvider};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Text returned when the provider produced no summary.
pub const SUMMARY_FALLBACK: &str = "Could not generate summary.";

const SUMMARY_TEMPERATURE: f32 = 0.7;
const ANSWER_SYSTEM_FRAMING: &str = "You are a helpful assistant for a personal blog and note app. \
Use the provided context to answer the user's questions about their own writings. \
Be concise and personal.";

pub type AugmentResult<T> = Result<T, AugmentationError>;

/// Augmentation operation names, used in errors and log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AugmentOperation {
    Summarize,
    SuggestTitleAndTags,
    AnswerWithContext,
}

impl AugmentOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::SuggestTitleAndTags => "suggest_title_and_tags",
            Self::AnswerWithContext => "answer_with_context",
        }
    }
}

/// Provider call failed or timed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AugmentationError {
    Failed {
        operation: AugmentOperation,
        source: ProviderError,
    },
}

impl Display for AugmentationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed { operation, source } => {
                write!(f, "{} failed: {source}", operation.as_str())
            }
        }
    }
}

impl Error for AugmentationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Failed { source, .. } => Some(source),
        }
    }
}

/// Suggested title and tags for one entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TitleSuggestion {
    pub title: String,
    pub tags: Vec<String>,
}

impl TitleSuggestion {
    /// Safe default used when the structured payload cannot be read.
    pub fn fallback() -> Self {
        Self {
            title: crate::model::entry::UNTITLED.to_string(),
            tags: Vec::new(),
        }
    }

    /// Parses the provider's JSON payload, falling back on any failure.
    pub fn parse_or_fallback(payload: Option<&str>) -> Self {
        let raw = payload.map(str::trim).unwrap_or_default();
        match serde_json::from_str::<TitleSuggestion>(raw) {
            Ok(suggestion) => suggestion,
            Err(err) => {
                warn!(
                    "event=ai_response module=ai op=suggest_title_and_tags status=malformed bytes={} error={}",
                    raw.len(),
                    err
                );
                Self::fallback()
            }
        }
    }
}

/// Response schema for title/tag suggestions.
pub fn title_and_tags_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "tags": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["title", "tags"]
    })
}

/// Augmentation operations bound to one provider and model.
pub struct AugmentationClient<P: TextProvider> {
    provider: P,
    model: String,
}

impl<P: TextProvider> AugmentationClient<P> {
    pub fn new(provider: P, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Requests a summary of at most three sentences.
    ///
    /// Returns [`SUMMARY_FALLBACK`] when the provider produced no text.
    pub async fn summarize(&self, content: &str) -> AugmentResult<String> {
        let request = GenerationRequest::new(
            self.model.as_str(),
            format!(
                "Please provide a concise summary (max 3 sentences) of the following content: \n\n{content}"
            ),
        )
        .with_temperature(SUMMARY_TEMPERATURE);

        let text = self.call(AugmentOperation::Summarize, &request).await?;
        Ok(text
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| SUMMARY_FALLBACK.to_string()))
    }

    /// Requests a short title and three tags as structured output.
    pub async fn suggest_title_and_tags(&self, content: &str) -> AugmentResult<TitleSuggestion> {
        let request = GenerationRequest::new(
            self.model.as_str(),
            format!(
                "Based on the following content, suggest a short catchy title and 3 relevant tags. \
Return in JSON format. \n\nContent: {content}"
            ),
        )
        .with_schema(title_and_tags_schema());

        let text = self
            .call(AugmentOperation::SuggestTitleAndTags, &request)
            .await?;
        Ok(TitleSuggestion::parse_or_fallback(text.as_deref()))
    }

    /// Answers `query` grounded in `context`.
    ///
    /// Returns an empty string when the provider produced no text.
    pub async fn answer_with_context(&self, query: &str, context: &str) -> AugmentResult<String> {
        let request = GenerationRequest::new(
            self.model.as_str(),
            format!("Context: {context}\n\nUser Question: {query}"),
        )
        .with_system(ANSWER_SYSTEM_FRAMING);

        let text = self
            .call(AugmentOperation::AnswerWithContext, &request)
            .await?;
        Ok(text.unwrap_or_default())
    }

    async fn call(
        &self,
        operation: AugmentOperation,
        request: &GenerationRequest,
    ) -> AugmentResult<Option<String>> {
        let started_at = Instant::now();
        match self.provider.generate(request).await {
            Ok(response) => {
                info!(
                    "event=ai_call module=ai provider={} op={} status=ok duration_ms={}",
                    self.provider.name(),
                    operation.as_str(),
                    started_at.elapsed().as_millis()
                );
                Ok(response.text)
            }
            Err(source) => {
                warn!(
                    "event=ai_call module=ai provider={} op={} status=error duration_ms={} error={}",
                    self.provider.name(),
                    operation.as_str(),
                    started_at.elapsed().as_millis(),
                    source
                );
                Err(AugmentationError::Failed { operation, source })
            }
        }
    }
}
