//! Graph memory layer
//!
//! Components:
//! - Extraction: decodes entity and relation tool calls
//! - Reconciliation: closed add / update / noop decisions
//! - GraphMemory: add, search, get_all and delete_all per user

pub mod extraction;
pub mod graph_memory;
pub mod reconcile;

pub use graph_memory::{GraphMemory, DEFAULT_LIMIT, SIMILARITY_THRESHOLD};
pub use reconcile::{AddRelation, MemoryDecision, UpdateRelation};
