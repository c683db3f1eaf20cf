//! Provider contract for single-turn text generation.

use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Transport-level failure of one provider round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// No API key was configured.
    MissingApiKey,
    /// Connection or I/O failure before a response arrived.
    Transport(String),
    /// The request exceeded its deadline.
    Timeout,
    /// The provider answered with a non-success status.
    Status { code: u16, message: String },
    /// The response envelope could not be decoded.
    Decode(String),
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "AI provider API key is not configured"),
            Self::Transport(message) => write!(f, "AI provider request failed: {message}"),
            Self::Timeout => write!(f, "AI provider request timed out"),
            Self::Status { code, message } => {
                write!(f, "AI provider returned status {code}: {message}")
            }
            Self::Decode(message) => write!(f, "AI provider response is unreadable: {message}"),
        }
    }
}

impl Error for ProviderError {}

/// One generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    /// Structured-output schema; when set the provider returns JSON text.
    pub schema: Option<Value>,
    /// System framing for the model.
    pub system: Option<String>,
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            schema: None,
            system: None,
            temperature: None,
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Provider answer. `text` is `None` when the model produced nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResponse {
    pub text: Option<String>,
}

impl GenerationResponse {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            text: Some(value.into()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// External text-generation service.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Stable provider name used in diagnostics.
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<GenerationResponse>;
}
