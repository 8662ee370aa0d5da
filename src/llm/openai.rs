//! OpenAI-compatible chat completions client
//!
//! Tool call arguments arrive as JSON-encoded strings and are decoded here.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{tools::ToolSchema, LlmClient};
use crate::errors::{MemoryError, Result};
use crate::types::{ChatMessage, LlmResponse, ToolCall};

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Chat completions client
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
}

impl OpenAiChatClient {
    pub fn with_config(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
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
            api_key,
            temperature,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiChatClient {
    async fn generate(&self, messages: &[ChatMessage], tools: &[ToolSchema]) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            tool_choice: (!tools.is_empty()).then_some("auto"),
            tools: tools.iter().map(ToolSchema::to_function).collect(),
            temperature: self.temperature,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
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

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| MemoryError::LlmApiError(format!("Failed to parse response: {}", e)))?;

        let message = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| MemoryError::LlmApiError("Response contained no choices".to_string()))?;

        let tool_calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                let arguments = if call.function.arguments.trim().is_empty() {
                    serde_json::Value::Object(Default::default())
                } else {
                    serde_json::from_str(&call.function.arguments).map_err(|e| {
                        MemoryError::ToolCall {
                            name: call.function.name.clone(),
                            reason: format!("arguments are not valid JSON: {}", e),
                        }
                    })?
                };
                Ok(ToolCall::new(call.function.name, arguments))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(LlmResponse {
            content: message.content.filter(|c| !c.is_empty()),
            tool_calls,
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<FunctionCall>>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    function: FunctionCallBody,
}

#[derive(Debug, Deserialize)]
struct FunctionCallBody {
    name: String,
    #[serde(default)]
    arguments: String,
}
