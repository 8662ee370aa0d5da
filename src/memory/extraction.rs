//! Decoding of the entity and relation extraction replies

use serde_json::Value;

use crate::errors::{MemoryError, Result};
use crate::llm::tools::{ESTABLISH_RELATIONSHIPS, EXTRACT_ENTITIES};
use crate::types::{EntityTypeMap, ExtractedRelation, LlmResponse};

/// Fill `map` from the first tool call of an entity extraction reply.
///
/// Entries decoded before a malformed one stay in the map.
pub fn parse_entities(response: &LlmResponse, map: &mut EntityTypeMap) -> Result<()> {
    let call = response
        .first_tool_call()
        .ok_or_else(|| MemoryError::ToolCall {
            name: EXTRACT_ENTITIES.to_string(),
            reason: "model returned no tool call".to_string(),
        })?;

    let entities = call
        .arguments
        .get("entities")
        .and_then(Value::as_array)
        .ok_or_else(|| MemoryError::ToolCall {
            name: call.name.clone(),
            reason: "missing 'entities' array".to_string(),
        })?;

    for item in entities {
        let entity = item.get("entity").and_then(Value::as_str);
        let entity_type = item.get("entity_type").and_then(Value::as_str);
        match (entity, entity_type) {
            (Some(entity), Some(entity_type)) => map.insert(entity, entity_type),
            _ => {
                return Err(MemoryError::ToolCall {
                    name: call.name.clone(),
                    reason: format!("malformed entity: {}", item),
                })
            }
        }
    }

    Ok(())
}

/// Relations from the first tool call; no tool call means no relations
pub fn parse_relations(response: &LlmResponse) -> Result<Vec<ExtractedRelation>> {
    let Some(call) = response.first_tool_call() else {
        return Ok(Vec::new());
    };

    let entities = call
        .arguments
        .get("entities")
        .cloned()
        .ok_or_else(|| MemoryError::ToolCall {
            name: ESTABLISH_RELATIONSHIPS.to_string(),
            reason: "missing 'entities' array".to_string(),
        })?;

    serde_json::from_value(entities).map_err(|e| MemoryError::ToolCall {
        name: call.name.clone(),
        reason: e.to_string(),
    })
}
