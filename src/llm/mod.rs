//! LLM clients
//!
//! The graph layer only needs one capability from a language model: given
//! role-tagged messages and a set of tool schemas, return the tool calls it
//! chose. Providers are selected by name at construction time.

pub mod ollama;
pub mod openai;
pub mod prompts;
pub mod tools;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::errors::{MemoryError, Result};
use crate::types::{ChatMessage, LlmResponse};

pub use ollama::OllamaChatClient;
pub use openai::OpenAiChatClient;
pub use tools::ToolSchema;

/// Tool-calling chat model
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send `messages` with `tools` available and return the model's reply
    async fn generate(&self, messages: &[ChatMessage], tools: &[ToolSchema]) -> Result<LlmResponse>;

    /// Model identifier
    fn model(&self) -> &str;
}

/// Build the client for the effective LLM provider
pub fn create_llm_client(config: &Config) -> Result<Arc<dyn LlmClient>> {
    let llm = &config.llm;
    let timeout = Duration::from_secs(llm.timeout_secs);

    match config.effective_llm_provider() {
        "ollama" => Ok(Arc::new(OllamaChatClient::with_config(
            llm.base_url.as_deref().unwrap_or(ollama::DEFAULT_OLLAMA_URL),
            &llm.model,
            llm.temperature,
            timeout,
        )?)),
        "openai" | "openai_structured" => Ok(Arc::new(OpenAiChatClient::with_config(
            llm.base_url.as_deref().unwrap_or(openai::DEFAULT_OPENAI_URL),
            &llm.model,
            llm.resolved_api_key(),
            llm.temperature,
            timeout,
        )?)),
        other => Err(MemoryError::UnsupportedProvider {
            kind: "llm",
            name: other.to_string(),
        }),
    }
}
