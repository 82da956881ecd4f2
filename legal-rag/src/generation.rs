//! Generation provider trait and chat request types.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{LegalRagError, Result};

/// Hosted model size tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Fastest and cheapest tier; the default.
    #[default]
    Small,
    /// Mid-sized tier.
    Medium,
    /// Most capable tier.
    Large,
}

impl ModelTier {
    /// Mistral model identifier for this tier.
    pub fn model_id(&self) -> &'static str {
        match self {
            Self::Small => "mistral-small-latest",
            Self::Medium => "mistral-medium-latest",
            Self::Large => "mistral-large-latest",
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_id())
    }
}

impl FromStr for ModelTier {
    type Err = LegalRagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" | "mistral-small-latest" => Ok(Self::Small),
            "medium" | "mistral-medium-latest" => Ok(Self::Medium),
            "large" | "mistral-large-latest" => Ok(Self::Large),
            _ => Err(LegalRagError::InvalidField { field: "model", value: s.to_string() }),
        }
    }
}

/// Chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the conversation.
    System,
    /// End-user content.
    User,
    /// Model output.
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Structured output mode requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// The model must answer with a single JSON object.
    Json,
}

/// One generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Conversation to complete.
    pub messages: Vec<ChatMessage>,
    /// Model tier to use.
    pub model: ModelTier,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token cap.
    pub max_tokens: Option<u32>,
    /// Optional structured output mode.
    pub response_format: Option<ResponseFormat>,
}

impl GenerationRequest {
    /// Create a request with no token cap and free-form output.
    pub fn new(messages: Vec<ChatMessage>, model: ModelTier, temperature: f32) -> Self {
        Self { messages, model, temperature, max_tokens: None, response_format: None }
    }

    /// Cap the completion length.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Request JSON-object output.
    pub fn json(mut self) -> Self {
        self.response_format = Some(ResponseFormat::Json);
        self
    }
}

/// Strip a surrounding Markdown code fence (```` ```json ... ``` ````) from model output.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    let inner = inner.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    inner.trim()
}

/// A hosted chat model.
///
/// Failures (quota, auth, network, malformed responses) surface as
/// [`LegalRagError::Generation`]; implementations never retry.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Complete the conversation and return the assistant text.
    async fn generate(&self, request: GenerationRequest) -> Result<String>;

    /// Provider name used in logs and errors.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_parses_short_and_full_names() {
        assert_eq!("large".parse::<ModelTier>().unwrap(), ModelTier::Large);
        assert_eq!("mistral-medium-latest".parse::<ModelTier>().unwrap(), ModelTier::Medium);
        assert!("gpt-4".parse::<ModelTier>().is_err());
        assert_eq!(ModelTier::default(), ModelTier::Small);
    }

    #[test]
    fn request_builders() {
        let request = GenerationRequest::new(vec![ChatMessage::user("hi")], ModelTier::Small, 0.3)
            .with_max_tokens(100)
            .json();
        assert_eq!(request.max_tokens, Some(100));
        assert_eq!(request.response_format, Some(ResponseFormat::Json));
    }

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
    }
}
