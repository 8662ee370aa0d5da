//! Message types for LLM communication
//!
//! Role-tagged chat messages sent to the LLM, and the structured tool
//! invocations it returns in place of free text.

use serde::{Deserialize, Serialize};

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Structured function invocation returned by the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name as declared in the request schema
    pub name: String,

    /// Decoded JSON arguments
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// LLM reply: optional text plus zero or more tool calls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

impl LlmResponse {
    /// Response carrying only tool calls
    pub fn with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls,
        }
    }

    /// First tool call, if any
    pub fn first_tool_call(&self) -> Option<&ToolCall> {
        self.tool_calls.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_serialization() {
        let msg = ChatMessage::system("be precise");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"role": "system", "content": "be precise"}));
    }

    #[test]
    fn test_tool_call_missing_arguments_defaults_to_null() {
        let call: ToolCall = serde_json::from_value(json!({"name": "noop"})).unwrap();
        assert_eq!(call.name, "noop");
        assert!(call.arguments.is_null());
    }

    #[test]
    fn test_first_tool_call() {
        let response = LlmResponse::with_tool_calls(vec![
            ToolCall::new("a", json!({})),
            ToolCall::new("b", json!({})),
        ]);
        assert_eq!(response.first_tool_call().unwrap().name, "a");
        assert!(LlmResponse::default().first_tool_call().is_none());
    }
}
