//! Type definitions module
//!
//! Core types for LLM communication and the knowledge graph data model.

pub mod messages;

// Re-export commonly used types
pub use messages::{ChatMessage, LlmResponse, Role, ToolCall};

// Graph data model
pub mod graph;
pub use graph::{
    normalize, Entity, EntityTypeMap, ExtractedRelation, Filters, Relation, RelationTriple,
    SearchCandidate,
};
