//! Mistral hosted models: `mistral-embed` embeddings and chat completions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{LegalRagError, Result};
use crate::generation::{ChatMessage, GenerationProvider, GenerationRequest, ResponseFormat};

const PROVIDER: &str = "Mistral";

/// The default Mistral API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";

/// The embedding model used for both ingestion and querying.
pub const EMBED_MODEL: &str = "mistral-embed";

/// Dimensionality of `mistral-embed` vectors.
pub const EMBED_DIMENSIONS: usize = 1024;

/// A client for the Mistral REST API.
///
/// Implements both [`EmbeddingProvider`] and [`GenerationProvider`] so one
/// credential serves the whole pipeline. Requests are never retried.
///
/// # Example
///
/// ```rust,ignore
/// use legal_rag::mistral::MistralClient;
///
/// let client = MistralClient::new(api_key)?;
/// let vector = client.embed("qualified immunity").await?;
/// ```
#[derive(Debug, Clone)]
pub struct MistralClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl MistralClient {
    /// Create a client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LegalRagError::Configuration("Mistral API key must not be empty".into()));
        }
        Ok(Self { client: reqwest::Client::new(), api_key, base_url: DEFAULT_BASE_URL.into() })
    }

    /// Point the client at a different API root (proxies, local mocks).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Reuse an existing HTTP client.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
        to_error: fn(String) -> LegalRagError,
    ) -> Result<R> {
        let url = format!("{}{path}", self.base_url);
        let response =
            self.client.post(&url).bearer_auth(&self.api_key).json(body).send().await.map_err(
                |e| {
                    error!(provider = PROVIDER, %url, error = %e, "request failed");
                    to_error(format!("request failed: {e}"))
                },
            )?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(ErrorResponse::into_message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %url, %status, "API error");
            return Err(to_error(format!("API returned {status}: {detail}")));
        }

        response.json().await.map_err(|e| {
            error!(provider = PROVIDER, %url, error = %e, "failed to parse response");
            to_error(format!("failed to parse response: {e}"))
        })
    }
}

// ── Mistral API request/response types ─────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireResponseFormat>,
}

#[derive(Serialize)]
struct WireResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Mistral returns either `{"message": ..}` or `{"detail": ..}` on failure.
#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn into_message(self) -> String {
        match (self.message, self.detail) {
            (Some(message), _) => message,
            (None, Some(serde_json::Value::String(detail))) => detail,
            (None, Some(detail)) => detail.to_string(),
            (None, None) => "unknown error".into(),
        }
    }
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for MistralClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| LegalRagError::embedding(PROVIDER, "API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = EMBED_MODEL, "embedding batch");

        let request = EmbeddingRequest { model: EMBED_MODEL, input: texts };
        let response: EmbeddingResponse =
            self.post("/embeddings", &request, |m| LegalRagError::embedding(PROVIDER, m)).await?;

        if response.data.len() != texts.len() {
            return Err(LegalRagError::embedding(
                PROVIDER,
                format!("expected {} embeddings, got {}", texts.len(), response.data.len()),
            ));
        }
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        EMBED_DIMENSIONS
    }

    fn model_name(&self) -> &str {
        EMBED_MODEL
    }
}

// ── GenerationProvider implementation ──────────────────────────────

#[async_trait]
impl GenerationProvider for MistralClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let model = request.model.model_id();
        debug!(
            provider = PROVIDER,
            model,
            messages = request.messages.len(),
            temperature = request.temperature,
            json = request.response_format.is_some(),
            "chat completion"
        );

        let body = ChatRequest {
            model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request
                .response_format
                .map(|ResponseFormat::Json| WireResponseFormat { kind: "json_object" }),
        };
        let response: ChatResponse =
            self.post("/chat/completions", &body, |m| LegalRagError::generation(PROVIDER, m)).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LegalRagError::generation(PROVIDER, "API returned no choices"))
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::ModelTier;

    #[test]
    fn empty_key_is_a_configuration_error() {
        assert!(matches!(MistralClient::new("  "), Err(LegalRagError::Configuration(_))));
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let client = MistralClient::new("key").unwrap().with_base_url("http://localhost:8080/v1/");
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn chat_request_serializes_json_mode() {
        let messages = vec![ChatMessage::system("rules"), ChatMessage::user("question")];
        let body = ChatRequest {
            model: ModelTier::Large.model_id(),
            messages: &messages,
            temperature: 0.1,
            max_tokens: None,
            response_format: Some(WireResponseFormat { kind: "json_object" }),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "mistral-large-latest");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["response_format"]["type"], "json_object");
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn error_detail_prefers_message() {
        let parsed: ErrorResponse =
            serde_json::from_str(r#"{"message": "Unauthorized", "detail": "x"}"#).unwrap();
        assert_eq!(parsed.into_message(), "Unauthorized");
        let parsed: ErrorResponse = serde_json::from_str(r#"{"detail": [{"msg": "bad"}]}"#).unwrap();
        assert!(parsed.into_message().contains("bad"));
    }
}
