//! Ollama chat client
//!
//! Non-streaming `POST /api/chat` with function tools. Ollama returns tool
//! call arguments as JSON objects.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{tools::ToolSchema, LlmClient};
use crate::errors::{MemoryError, Result};
use crate::types::{ChatMessage, LlmResponse, ToolCall};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

/// Ollama chat client
#[derive(Debug, Clone)]
pub struct OllamaChatClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaChatClient {
    /// Create Ollama client with custom configuration
    pub fn with_config(
        base_url: &str,
        model: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(MemoryError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
        })
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/version", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LlmClient for OllamaChatClient {
    async fn generate(&self, messages: &[ChatMessage], tools: &[ToolSchema]) -> Result<LlmResponse> {
        let url = format!("{}/api/chat", self.base_url);

        let request = OllamaChatRequest {
            model: &self.model,
            messages,
            tools: tools.iter().map(ToolSchema::to_function).collect(),
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| MemoryError::LlmApiError(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MemoryError::LlmApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| MemoryError::LlmApiError(format!("Failed to parse response: {}", e)))?;

        let content = Some(body.message.content).filter(|c| !c.is_empty());
        let tool_calls = body
            .message
            .tool_calls
            .into_iter()
            .map(|call| ToolCall::new(call.function.name, call.function.arguments))
            .collect();

        Ok(LlmResponse {
            content,
            tool_calls,
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat response
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<OllamaToolCall>,
}

#[derive(Debug, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

#[derive(Debug, Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::tools;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_client_creation() {
        let client = OllamaChatClient::with_config(
            DEFAULT_OLLAMA_URL,
            DEFAULT_MODEL,
            0.0,
            Duration::from_secs(120),
        )
        .unwrap();
        assert_eq!(client.model(), DEFAULT_MODEL);
        assert_eq!(client.base_url(), DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = OllamaChatClient::with_config(
            "http://localhost:11434/",
            "llama3.1:8b",
            0.0,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_generate_parses_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"model": "llama3.1:8b", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3.1:8b",
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{
                        "function": {
                            "name": "extract_entities",
                            "arguments": {"entities": [{"entity": "u1", "entity_type": "person"}]}
                        }
                    }]
                },
                "done": true
            })))
            .mount(&server)
            .await;

        let client =
            OllamaChatClient::with_config(&server.uri(), "llama3.1:8b", 0.0, Duration::from_secs(5))
                .unwrap();
        let response = client
            .generate(
                &[ChatMessage::user("I am u1")],
                &[tools::extract_entities_tool(false)],
            )
            .await
            .unwrap();

        assert!(response.content.is_none());
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "extract_entities");
        assert_eq!(
            response.tool_calls[0].arguments["entities"][0]["entity"],
            json!("u1")
        );
    }

    #[tokio::test]
    async fn test_generate_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let client =
            OllamaChatClient::with_config(&server.uri(), "missing", 0.0, Duration::from_secs(5))
                .unwrap();
        let err = client
            .generate(&[ChatMessage::user("hi")], &[])
            .await
            .unwrap_err();

        assert!(matches!(err, MemoryError::LlmApiError(ref m) if m.contains("404")));
    }
}
