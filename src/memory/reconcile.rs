//! Add / update / noop decisions decoded from reconciliation tool calls

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::errors::{MemoryError, Result};
use crate::llm::tools::{ADD_GRAPH_MEMORY, NOOP, UPDATE_GRAPH_MEMORY};
use crate::types::ToolCall;

/// Arguments of `add_graph_memory`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AddRelation {
    pub source: String,
    pub destination: String,
    pub relationship: String,
    pub source_type: String,
    pub destination_type: String,
}

/// Arguments of `update_graph_memory`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateRelation {
    pub source: String,
    pub destination: String,
    pub relationship: String,
    /// Destination whose edge from `source` is replaced, when the target changes
    #[serde(default)]
    pub previous_destination: Option<String>,
}

impl UpdateRelation {
    /// Previous destination, ignoring blanks sent by strict-mode models
    pub fn previous_destination(&self) -> Option<&str> {
        self.previous_destination
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// What the model decided for one extracted relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryDecision {
    Add(AddRelation),
    Update(UpdateRelation),
    Noop,
}

impl MemoryDecision {
    /// Decode a tool call; `Ok(None)` when the tool name is not a decision
    pub fn from_tool_call(call: &ToolCall) -> Result<Option<Self>> {
        let decision = match call.name.as_str() {
            ADD_GRAPH_MEMORY => MemoryDecision::Add(decode(call)?),
            UPDATE_GRAPH_MEMORY => MemoryDecision::Update(decode(call)?),
            NOOP => MemoryDecision::Noop,
            _ => return Ok(None),
        };
        Ok(Some(decision))
    }
}

fn decode<T: DeserializeOwned>(call: &ToolCall) -> Result<T> {
    serde_json::from_value(call.arguments.clone()).map_err(|e| MemoryError::ToolCall {
        name: call.name.clone(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_add() {
        let call = ToolCall::new(
            ADD_GRAPH_MEMORY,
            json!({
                "source": "u1",
                "destination": "acme",
                "relationship": "works_at",
                "source_type": "person",
                "destination_type": "organization"
            }),
        );

        match MemoryDecision::from_tool_call(&call).unwrap() {
            Some(MemoryDecision::Add(add)) => {
                assert_eq!(add.destination, "acme");
                assert_eq!(add.destination_type, "organization");
            }
            other => panic!("expected add, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_update_with_and_without_previous() {
        let call = ToolCall::new(
            UPDATE_GRAPH_MEMORY,
            json!({"source": "u1", "destination": "beta", "relationship": "works_at"}),
        );
        let Some(MemoryDecision::Update(update)) = MemoryDecision::from_tool_call(&call).unwrap()
        else {
            panic!("expected update");
        };
        assert_eq!(update.previous_destination(), None);

        let call = ToolCall::new(
            UPDATE_GRAPH_MEMORY,
            json!({
                "source": "u1",
                "destination": "beta",
                "relationship": "works_at",
                "previous_destination": "acme"
            }),
        );
        let Some(MemoryDecision::Update(update)) = MemoryDecision::from_tool_call(&call).unwrap()
        else {
            panic!("expected update");
        };
        assert_eq!(update.previous_destination(), Some("acme"));
    }

    #[test]
    fn test_blank_previous_destination_is_none() {
        let update = UpdateRelation {
            source: "u1".to_string(),
            destination: "beta".to_string(),
            relationship: "works_at".to_string(),
            previous_destination: Some("  ".to_string()),
        };
        assert_eq!(update.previous_destination(), None);
    }

    #[test]
    fn test_noop_ignores_arguments() {
        let call = ToolCall::new(NOOP, json!({"anything": 1}));
        assert_eq!(
            MemoryDecision::from_tool_call(&call).unwrap(),
            Some(MemoryDecision::Noop)
        );
    }

    #[test]
    fn test_unknown_tool_is_none() {
        let call = ToolCall::new("delete_graph_memory", json!({}));
        assert_eq!(MemoryDecision::from_tool_call(&call).unwrap(), None);
    }

    #[test]
    fn test_malformed_arguments() {
        let call = ToolCall::new(ADD_GRAPH_MEMORY, json!({"source": "u1"}));
        assert!(matches!(
            MemoryDecision::from_tool_call(&call),
            Err(MemoryError::ToolCall { .. })
        ));
    }
}
