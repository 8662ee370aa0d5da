//! Tool schemas offered to the LLM
//!
//! Every tool exists in a plain form and a strict ("structured") form. The
//! strict form lists every property as required, forbids extra properties and
//! models optional fields as nullable, which is what strict function calling
//! demands.

use serde::Serialize;
use serde_json::{json, Map, Value};

pub const EXTRACT_ENTITIES: &str = "extract_entities";
pub const ESTABLISH_RELATIONSHIPS: &str = "establish_relationships";
pub const ADD_GRAPH_MEMORY: &str = "add_graph_memory";
pub const UPDATE_GRAPH_MEMORY: &str = "update_graph_memory";
pub const NOOP: &str = "noop";

/// A callable function declared to the LLM
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

impl ToolSchema {
    /// `{"type": "function", "function": {...}}` wrapper shared by Ollama and OpenAI
    pub fn to_function(&self) -> Value {
        json!({
            "type": "function",
            "function": self,
        })
    }
}

/// Property kinds used by the schemas below
enum Prop {
    Text(&'static str),
    OptionalText(&'static str),
}

fn object_schema(props: &[(&'static str, Prop)], structured: bool) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for (name, prop) in props {
        let schema = match prop {
            Prop::Text(desc) => {
                required.push(*name);
                json!({"type": "string", "description": desc})
            }
            Prop::OptionalText(desc) if structured => {
                required.push(*name);
                json!({"type": ["string", "null"], "description": desc})
            }
            Prop::OptionalText(desc) => json!({"type": "string", "description": desc}),
        };
        properties.insert((*name).to_string(), schema);
    }

    let mut schema = json!({
        "type": "object",
        "properties": properties,
        "required": required,
    });
    if structured {
        schema["additionalProperties"] = Value::Bool(false);
    }
    schema
}

fn list_schema(
    field: &'static str,
    description: &'static str,
    item: &[(&'static str, Prop)],
    structured: bool,
) -> Value {
    let mut schema = json!({
        "type": "object",
        "properties": {
            field: {
                "type": "array",
                "description": description,
                "items": object_schema(item, structured),
            }
        },
        "required": [field],
    });
    if structured {
        schema["additionalProperties"] = Value::Bool(false);
    }
    schema
}

fn strict_flag(structured: bool) -> Option<bool> {
    structured.then_some(true)
}

/// Entity extraction: `{entities: [{entity, entity_type}]}`
pub fn extract_entities_tool(structured: bool) -> ToolSchema {
    ToolSchema {
        name: EXTRACT_ENTITIES,
        description: "Extract entities and their types from the text.",
        parameters: list_schema(
            "entities",
            "An array of entities with their types.",
            &[
                ("entity", Prop::Text("The name or identifier of the entity.")),
                ("entity_type", Prop::Text("The type or category of the entity.")),
            ],
            structured,
        ),
        strict: strict_flag(structured),
    }
}

/// Relation extraction: `{entities: [{source, relation, destination}]}`
pub fn relations_tool(structured: bool) -> ToolSchema {
    ToolSchema {
        name: ESTABLISH_RELATIONSHIPS,
        description: "Establish relationships among the entities based on the provided text.",
        parameters: list_schema(
            "entities",
            "An array of relationships between entities.",
            &[
                ("source", Prop::Text("The source entity of the relationship.")),
                ("relation", Prop::Text("The relationship between the source and destination entities.")),
                ("destination", Prop::Text("The destination entity of the relationship.")),
            ],
            structured,
        ),
        strict: strict_flag(structured),
    }
}

/// Reconciliation: a brand-new relation
pub fn add_memory_tool(structured: bool) -> ToolSchema {
    ToolSchema {
        name: ADD_GRAPH_MEMORY,
        description: "Add a new graph memory to the knowledge graph. This function creates a new \
                      relationship between two nodes, potentially creating new nodes if they don't exist.",
        parameters: object_schema(
            &[
                ("source", Prop::Text("The identifier of the source node in the new relationship.")),
                ("destination", Prop::Text("The identifier of the destination node in the new relationship.")),
                ("relationship", Prop::Text("The type of relationship between the source and destination nodes.")),
                ("source_type", Prop::Text("The type or category of the source node.")),
                ("destination_type", Prop::Text("The type or category of the destination node.")),
            ],
            structured,
        ),
        strict: strict_flag(structured),
    }
}

/// Reconciliation: overwrite an existing relation
pub fn update_memory_tool(structured: bool) -> ToolSchema {
    ToolSchema {
        name: UPDATE_GRAPH_MEMORY,
        description: "Update the relationship of an existing graph memory based on new information. \
                      Any existing relationship between source and destination is replaced. When the \
                      new information changes the destination of a fact, name the old destination in \
                      previous_destination so its relationship is removed.",
        parameters: object_schema(
            &[
                ("source", Prop::Text("The identifier of the source node in the relationship being updated.")),
                ("destination", Prop::Text("The identifier of the destination node in the relationship being updated.")),
                ("relationship", Prop::Text("The new or updated relationship between the source and destination nodes.")),
                (
                    "previous_destination",
                    Prop::OptionalText("The destination of the existing relationship being replaced, if it differs."),
                ),
            ],
            structured,
        ),
        strict: strict_flag(structured),
    }
}

/// Reconciliation: fact already stored
pub fn noop_tool(structured: bool) -> ToolSchema {
    let mut parameters = json!({
        "type": "object",
        "properties": {},
        "required": [],
    });
    if structured {
        parameters["additionalProperties"] = Value::Bool(false);
    }

    ToolSchema {
        name: NOOP,
        description: "No operation should be performed to the graph entities.",
        parameters,
        strict: strict_flag(structured),
    }
}

/// Tools offered for the add / update / noop decision
pub fn reconciliation_tools(structured: bool) -> Vec<ToolSchema> {
    vec![
        update_memory_tool(structured),
        add_memory_tool(structured),
        noop_tool(structured),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_update_tool_has_optional_previous_destination() {
        let tool = update_memory_tool(false);
        let required = tool.parameters["required"].as_array().unwrap();
        assert_eq!(required.len(), 3);
        assert!(!required.contains(&json!("previous_destination")));
        assert!(tool.strict.is_none());
        assert!(tool.parameters.get("additionalProperties").is_none());
    }

    #[test]
    fn test_structured_tools_are_strict() {
        for tool in reconciliation_tools(true) {
            assert_eq!(tool.strict, Some(true));
            assert_eq!(tool.parameters["additionalProperties"], json!(false));
            let props = tool.parameters["properties"].as_object().unwrap();
            let required = tool.parameters["required"].as_array().unwrap();
            assert_eq!(props.len(), required.len(), "tool {}", tool.name);
        }
    }

    #[test]
    fn test_structured_list_items_are_strict() {
        let tool = extract_entities_tool(true);
        let items = &tool.parameters["properties"]["entities"]["items"];
        assert_eq!(items["additionalProperties"], json!(false));
        assert_eq!(items["required"], json!(["entity", "entity_type"]));
    }

    #[test]
    fn test_function_wrapper() {
        let value = noop_tool(false).to_function();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], NOOP);
        assert!(value["function"].get("strict").is_none());
    }

    #[test]
    fn test_reconciliation_tool_order() {
        let names: Vec<_> = reconciliation_tools(false).iter().map(|t| t.name).collect();
        assert_eq!(names, vec![UPDATE_GRAPH_MEMORY, ADD_GRAPH_MEMORY, NOOP]);
    }
}
