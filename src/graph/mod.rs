//! Graph database adapters
//!
//! The memory layer talks to a graph exclusively through [`GraphStore::run`]
//! with a closed set of [`GraphQuery`] shapes. Results are positional rows.

pub mod falkordb;
pub mod in_memory;
pub mod neo4j;
pub mod query;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::GraphStoreConfig;
use crate::errors::{MemoryError, Result};

pub use falkordb::FalkorDbStore;
pub use in_memory::InMemoryGraphStore;
pub use neo4j::Neo4jStore;
pub use query::{CypherStatement, Dialect, GraphQuery, NodeSpec};

/// One result row, columns in query order
pub type Row = Vec<serde_json::Value>;

/// Graph backend scoped by user id
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Execute a query on behalf of `user_id`
    async fn run(&self, user_id: &str, query: &GraphQuery) -> Result<Vec<Row>>;

    /// Provider name as used in configuration
    fn provider(&self) -> &'static str;
}

/// Open the graph store named by `config.provider`
pub async fn connect_graph_store(config: &GraphStoreConfig) -> Result<Arc<dyn GraphStore>> {
    match config.provider.as_str() {
        "neo4j" => Ok(Arc::new(Neo4jStore::new(
            &config.url,
            &config.database,
            config.username.clone(),
            config.password.clone(),
        )?)),
        "falkordb" => Ok(Arc::new(FalkorDbStore::connect(&config.url).await?)),
        "memory" => Ok(Arc::new(InMemoryGraphStore::new())),
        other => Err(MemoryError::UnsupportedProvider {
            kind: "graph",
            name: other.to_string(),
        }),
    }
}
