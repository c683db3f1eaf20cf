//! Gemini `generateContent` REST provider.
//!
//! # Responsibility
//! - Map [`GenerationRequest`] onto the `models/{model}:generateContent`
//!   request body.
//! - Collapse the first candidate's text parts into one string.
//! - Classify transport, timeout, status and decode failures.
//!
//! # Invariants
//! - The API key travels only in the `x-goog-api-key` header.

use crate::ai::provider::{
    GenerationRequest, GenerationResponse, ProviderError, ProviderResult, TextProvider,
};
use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";
const JSON_MIME_TYPE: &str = "application/json";

/// HTTP provider for the Gemini API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GeminiProvider {
    /// Builds a provider for `endpoint` (the API base, without `/models`).
    ///
    /// A missing key is accepted here and reported on the first request, so
    /// the rest of the application stays usable without AI access.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ProviderError::Transport(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn url_for(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<GenerationResponse> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ProviderError::MissingApiKey);
        };

        let body = build_request_body(request);
        let started_at = Instant::now();
        let response = self
            .client
            .post(self.url_for(&request.model))
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&raw)
                .ok()
                .and_then(|envelope| envelope.error)
                .map(|detail| detail.message)
                .unwrap_or(raw);
            warn!(
                "event=ai_request module=ai provider=gemini status=error http_status={} duration_ms={}",
                status.as_u16(),
                started_at.elapsed().as_millis()
            );
            return Err(ProviderError::Status {
                code: status.as_u16(),
                message,
            });
        }

        let decoded: GenerateContentResponse =
            response.json().await.map_err(classify_reqwest_error)?;
        let text = collect_text(decoded);
        info!(
            "event=ai_request module=ai provider=gemini status=ok has_text={} duration_ms={}",
            text.is_some(),
            started_at.elapsed().as_millis()
        );
        Ok(GenerationResponse { text })
    }
}

fn build_request_body(request: &GenerationRequest) -> GenerateContentRequest<'_> {
    let generation_config = if request.temperature.is_some() || request.schema.is_some() {
        Some(GenerationConfig {
            temperature: request.temperature,
            response_mime_type: request.schema.as_ref().map(|_| JSON_MIME_TYPE),
            response_schema: request.schema.as_ref(),
        })
    } else {
        None
    };

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part {
                text: request.prompt.as_str(),
            }],
        }],
        system_instruction: request.system.as_deref().map(|system| Content {
            role: None,
            parts: vec![Part { text: system }],
        }),
        generation_config,
    }
}

fn collect_text(response: GenerateContentResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else if err.is_decode() {
        ProviderError::Decode(err.to_string())
    } else {
        ProviderError::Transport(err.to_string())
    }
}
