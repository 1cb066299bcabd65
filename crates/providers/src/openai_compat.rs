//! OpenAI-compatible provider implementation.
//!
//! Works with: Ollama, LM Studio, llama.cpp server, vLLM, and any other
//! server exposing an OpenAI-compatible `/v1/chat/completions` endpoint.
//!
//! Supports:
//! - Non-streaming chat completions with per-request timeouts
//! - Model listing and health checks

use async_trait::async_trait;
use localpilot_core::error::ProviderError;
use localpilot_core::message::{Message, Role};
use localpilot_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Client-level timeout used when none is configured.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// An OpenAI-compatible LLM provider for locally hosted model servers.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            client: build_client(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into();
        self.api_key = (!key.is_empty()).then_some(key);
        self
    }

    /// Bound every request by `secs` at the HTTP client level.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.client = build_client(secs);
        self
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new("ollama", base_url.unwrap_or("http://localhost:11434/v1"))
    }

    /// Create an LM Studio provider (convenience constructor).
    pub fn lmstudio(base_url: Option<&str>) -> Self {
        Self::new("lmstudio", base_url.unwrap_or("http://localhost:1234/v1"))
    }

    /// Create a llama.cpp server provider (convenience constructor).
    pub fn llamacpp(base_url: Option<&str>) -> Self {
        Self::new("llamacpp", base_url.unwrap_or("http://localhost:8080/v1"))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {key}")),
            None => builder,
        }
    }

    /// Convert our Message types to OpenAI API format.
    ///
    /// Tool calls travel as text inside assistant messages, so a tool result
    /// has no native `tool_calls` entry to attach to. It is sent as a user
    /// message tagged with its call id instead.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| match m.role {
                Role::Tool => ApiMessage {
                    role: "user".into(),
                    content: format!(
                        "Tool result ({}):\n{}",
                        m.tool_call_id.as_deref().unwrap_or("unknown"),
                        m.content
                    ),
                },
                role => ApiMessage {
                    role: match role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                        _ => "system",
                    }
                    .into(),
                    content: m.content.clone(),
                },
            })
            .collect()
    }
}

fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

fn map_send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Map a non-200 status and its body to a provider error.
fn status_error(status: u16, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: 5,
        },
        401 | 403 => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

#[async_trait]
impl localpilot_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let mut builder = self
            .authorize(self.client.post(&url))
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(secs) = request.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let response = builder.send().await.map_err(map_send_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Model server returned error");
            return Err(status_error(status, error_body));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            model: api_response.model.unwrap_or(request.model),
        })
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(parse_model_ids(&body))
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(map_send_error)?;

        Ok(response.status().is_success())
    }
}

fn parse_model_ids(body: &serde_json::Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|m| m["id"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use localpilot_core::Provider;

    #[test]
    fn ollama_constructor() {
        let provider = OpenAiCompatProvider::ollama(None);
        assert_eq!(provider.name(), "ollama");
        assert!(provider.base_url().contains("localhost:11434"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = OpenAiCompatProvider::new("vllm", "http://localhost:8000/v1/");
        assert_eq!(provider.base_url(), "http://localhost:8000/v1");
    }

    #[test]
    fn empty_api_key_is_ignored() {
        let provider = OpenAiCompatProvider::lmstudio(None).with_api_key("");
        assert!(provider.api_key.is_none());
        let provider = OpenAiCompatProvider::lmstudio(None).with_api_key("sk-local");
        assert_eq!(provider.api_key.as_deref(), Some("sk-local"));
    }

    #[test]
    fn message_conversion() {
        let messages = vec![
            Message::system("You are a coding agent"),
            Message::user("Hello"),
            Message::assistant("Hi"),
        ];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 3);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
        assert_eq!(api_messages[2].role, "assistant");
    }

    #[test]
    fn tool_result_is_sent_as_tagged_user_message() {
        let msg = Message::tool_result("call_1", "[SUCCESS]\nfile contents");
        let api_msgs = OpenAiCompatProvider::to_api_messages(&[msg]);
        assert_eq!(api_msgs[0].role, "user");
        assert!(api_msgs[0].content.starts_with("Tool result (call_1):"));
        assert!(api_msgs[0].content.contains("file contents"));
    }

    #[test]
    fn status_errors_map_to_variants() {
        assert!(matches!(
            status_error(429, String::new()),
            ProviderError::RateLimited { .. }
        ));
        assert!(matches!(
            status_error(401, String::new()),
            ProviderError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            status_error(503, "loading model".into()),
            ProviderError::ApiError { status_code: 503, ref message } if message == "loading model"
        ));
    }

    #[test]
    fn parse_chat_response() {
        let data = r#"{
            "id": "chatcmpl-1",
            "model": "qwen2.5-coder:7b",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "4"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 1, "total_tokens": 13}
        }"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.model.as_deref(), Some("qwen2.5-coder:7b"));
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("4"));
        assert_eq!(parsed.usage.unwrap().total_tokens, 13);
    }

    #[test]
    fn parse_response_without_usage_or_content() {
        let data = r#"{"choices": [{"message": {"role": "assistant"}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert!(parsed.usage.is_none());
        assert!(parsed.model.is_none());
        assert!(parsed.choices[0].message.content.is_none());
    }

    #[test]
    fn model_ids_from_listing() {
        let body = serde_json::json!({
            "object": "list",
            "data": [{"id": "qwen2.5-coder:7b"}, {"id": "llama3.1:8b"}]
        });
        assert_eq!(parse_model_ids(&body), vec!["qwen2.5-coder:7b", "llama3.1:8b"]);
        assert!(parse_model_ids(&serde_json::json!({})).is_empty());
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let provider = OpenAiCompatProvider::new("test", "http://127.0.0.1:9/v1").with_timeout(2);
        let err = provider.health_check().await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Network(_) | ProviderError::Timeout(_)
        ));
    }
}
