//! kgmemory - Knowledge graph memory layer
//!
//! Maintains a per-user graph of entities and relationships extracted from
//! natural-language text by a tool-calling LLM.
//!
//! # Architecture
//!
//! - **llm / embedding**: chat and embedding clients behind traits
//! - **graph**: Neo4j, FalkorDB and in-memory stores behind `GraphStore`
//! - **memory**: extraction, add / update / noop reconciliation, search
//! - **rerank**: BM25 over candidate relation triples

pub mod errors;
pub mod types;
pub mod config;

// Collaborators
pub mod llm;
pub mod embedding;
pub mod graph;

// Memory layer
pub mod rerank;
pub mod memory;

pub mod cli;

// Re-export commonly used types
pub use config::Config;
pub use errors::{MemoryError, Result};
pub use memory::GraphMemory;
pub use types::{Filters, RelationTriple};
