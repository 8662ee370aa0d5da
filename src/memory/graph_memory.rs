//! Graph memory: LLM-driven extraction and reconciliation over a graph store

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::extraction::{parse_entities, parse_relations};
use super::reconcile::{AddRelation, MemoryDecision, UpdateRelation};
use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::errors::{MemoryError, Result};
use crate::graph::{connect_graph_store, GraphQuery, GraphStore, NodeSpec, Row};
use crate::llm::prompts::{
    entity_extraction_messages, format_relations, relation_extraction_messages,
    update_memory_messages,
};
use crate::llm::tools::{
    extract_entities_tool, reconciliation_tools, relations_tool, ADD_GRAPH_MEMORY,
    UPDATE_GRAPH_MEMORY,
};
use crate::llm::{create_llm_client, LlmClient};
use crate::rerank::{rerank_candidates, SEARCH_RESULT_LIMIT};
use crate::types::{
    normalize, EntityTypeMap, ExtractedRelation, Filters, RelationTriple, SearchCandidate,
};

/// Minimum node similarity for a relation to become a candidate
pub const SIMILARITY_THRESHOLD: f64 = 0.7;

/// Default number of rows per similarity query and per listing
pub const DEFAULT_LIMIT: usize = 100;

/// Per-user knowledge graph memory
pub struct GraphMemory {
    config: Config,
    graph: Arc<dyn GraphStore>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LlmClient>,
    structured: bool,
}

impl GraphMemory {
    /// Build every collaborator from configuration
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let graph = connect_graph_store(&config.graph_store).await?;
        let embedder = create_embedder(&config.embedder)?;
        let llm = create_llm_client(&config)?;

        Ok(Self::with_components(config, graph, embedder, llm))
    }

    /// Use already constructed collaborators
    pub fn with_components(
        config: Config,
        graph: Arc<dyn GraphStore>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        let structured = config.uses_structured_tools();
        Self {
            config,
            graph,
            embedder,
            llm,
            structured,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn graph(&self) -> &Arc<dyn GraphStore> {
        &self.graph
    }

    /// Extract facts from `data` and reconcile them with the user's graph.
    ///
    /// Returns the relations written by the add path. Relations rewritten by
    /// the update path are applied but not returned.
    pub async fn add(&self, data: &str, filters: &Filters) -> Result<Vec<RelationTriple>> {
        let (search_output, entity_type_map) =
            self.retrieve_candidates(data, filters, DEFAULT_LIMIT).await?;

        let extracted = self.extract_relations(data, filters, &entity_type_map).await?;
        debug!("Extracted relations: {:?}", extracted);

        let existing_memories = format_relations(
            search_output
                .iter()
                .map(|c| (c.source.as_str(), c.relationship.as_str(), c.destination.as_str())),
        );
        let new_memories = format_relations(
            extracted
                .iter()
                .map(|r| (r.source.as_str(), r.relation.as_str(), r.destination.as_str())),
        );

        let messages = update_memory_messages(&existing_memories, &new_memories);
        let response = self
            .llm
            .generate(&messages, &reconciliation_tools(self.structured))
            .await?;

        let mut to_add: Vec<AddRelation> = Vec::new();
        for call in &response.tool_calls {
            match MemoryDecision::from_tool_call(call)? {
                Some(MemoryDecision::Add(addition)) => to_add.push(addition),
                Some(MemoryDecision::Update(update)) => {
                    self.update_relationship(&update, filters).await?
                }
                Some(MemoryDecision::Noop) => {}
                None => warn!("Ignoring unknown tool call: {}", call.name),
            }
        }

        let mut added = Vec::with_capacity(to_add.len());
        for addition in &to_add {
            added.push(self.add_relationship(addition, filters).await?);
        }

        info!("Added {} new memories to the graph", added.len());
        Ok(added)
    }

    /// Relations relevant to `query`, best first, at most five
    pub async fn search(
        &self,
        query: &str,
        filters: &Filters,
        limit: usize,
    ) -> Result<Vec<RelationTriple>> {
        let (candidates, _) = self.retrieve_candidates(query, filters, limit).await?;

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let results = rerank_candidates(query, &candidates, SEARCH_RESULT_LIMIT);
        info!("Returned {} search results", results.len());
        Ok(results)
    }

    /// Every relation of the user, up to `limit`
    pub async fn get_all(&self, filters: &Filters, limit: usize) -> Result<Vec<RelationTriple>> {
        let rows = self
            .graph_query(filters, &GraphQuery::ListRelations { limit })
            .await?;

        let relations = rows
            .iter()
            .map(|row| RelationTriple::from_row(row))
            .collect::<Result<Vec<_>>>()?;

        info!("Retrieved {} relationships", relations.len());
        Ok(relations)
    }

    /// Remove every node and edge of the user
    pub async fn delete_all(&self, filters: &Filters) -> Result<()> {
        self.graph_query(filters, &GraphQuery::DeleteUser).await?;
        Ok(())
    }

    /// Extract entities from `query` and collect relations around similar nodes
    async fn retrieve_candidates(
        &self,
        query: &str,
        filters: &Filters,
        limit: usize,
    ) -> Result<(Vec<SearchCandidate>, EntityTypeMap)> {
        let messages = entity_extraction_messages(&filters.user_id, query);
        let response = self
            .llm
            .generate(&messages, &[extract_entities_tool(self.structured)])
            .await?;

        let mut entity_type_map = EntityTypeMap::new();
        if let Err(e) = parse_entities(&response, &mut entity_type_map) {
            error!("Error in search tool: {}", e);
        }
        debug!("Entity type map: {:?}", entity_type_map);

        let mut candidates = Vec::new();
        for name in entity_type_map.names() {
            let embedding = self.embedder.embed(name).await?;
            let rows = self
                .graph_query(
                    filters,
                    &GraphQuery::SimilarRelations {
                        embedding,
                        threshold: SIMILARITY_THRESHOLD,
                        limit,
                    },
                )
                .await?;

            for row in &rows {
                candidates.push(SearchCandidate::from_row(row)?);
            }
        }

        Ok((candidates, entity_type_map))
    }

    async fn extract_relations(
        &self,
        data: &str,
        filters: &Filters,
        entity_type_map: &EntityTypeMap,
    ) -> Result<Vec<ExtractedRelation>> {
        let messages = relation_extraction_messages(
            &filters.user_id,
            data,
            self.config.graph_store.custom_prompt.as_deref(),
            entity_type_map.names(),
        );

        let response = self
            .llm
            .generate(&messages, &[relations_tool(self.structured)])
            .await?;

        parse_relations(&response)
    }

    async fn add_relationship(
        &self,
        addition: &AddRelation,
        filters: &Filters,
    ) -> Result<RelationTriple> {
        let source = normalize(&addition.source);
        let destination = normalize(&addition.destination);
        let relationship = normalize(&addition.relationship);
        require_relationship(ADD_GRAPH_MEMORY, &relationship)?;

        let source_embedding = self.embedder.embed(&source).await?;
        let dest_embedding = self.embedder.embed(&destination).await?;

        let query = GraphQuery::MergeRelation {
            source: NodeSpec {
                name: source.clone(),
                label: normalize(&addition.source_type),
                embedding: source_embedding,
            },
            destination: NodeSpec {
                name: destination.clone(),
                label: normalize(&addition.destination_type),
                embedding: dest_embedding,
            },
            relationship: relationship.clone(),
        };
        self.graph_query(filters, &query).await?;

        Ok(RelationTriple::new(source, relationship, destination))
    }

    /// Replace whatever connects source to destination (and to the previous
    /// destination, when named) with a single edge of the new type
    async fn update_relationship(&self, update: &UpdateRelation, filters: &Filters) -> Result<()> {
        let source = normalize(&update.source);
        let target = normalize(&update.destination);
        let relationship = normalize(&update.relationship);
        require_relationship(UPDATE_GRAPH_MEMORY, &relationship)?;

        info!("Updating relationship: {} -{}-> {}", source, relationship, target);

        let source_embedding = self.embedder.embed(&source).await?;
        let target_embedding = self.embedder.embed(&target).await?;

        self.graph_query(
            filters,
            &GraphQuery::EnsureNodes {
                source: source.clone(),
                target: target.clone(),
                source_embedding,
                target_embedding,
            },
        )
        .await?;

        self.graph_query(
            filters,
            &GraphQuery::DeleteRelationsBetween {
                source: source.clone(),
                target: target.clone(),
            },
        )
        .await?;

        if let Some(previous) = update.previous_destination().map(normalize) {
            if previous != target {
                self.graph_query(
                    filters,
                    &GraphQuery::DeleteRelationsBetween {
                        source: source.clone(),
                        target: previous,
                    },
                )
                .await?;
            }
        }

        let rows = self
            .graph_query(
                filters,
                &GraphQuery::CreateRelation {
                    source: source.clone(),
                    target: target.clone(),
                    relationship,
                },
            )
            .await?;

        if rows.is_empty() {
            return Err(MemoryError::RelationshipUpdateFailed {
                source_node: source,
                target_node: target,
            });
        }

        Ok(())
    }

    async fn graph_query(&self, filters: &Filters, query: &GraphQuery) -> Result<Vec<Row>> {
        self.graph.run(&filters.user_id, query).await
    }
}

/// Relationship types become edge labels and cannot be empty
fn require_relationship(tool: &str, relationship: &str) -> Result<()> {
    if relationship.is_empty() {
        return Err(MemoryError::ToolCall {
            name: tool.to_string(),
            reason: "relationship must not be empty".to_string(),
        });
    }
    Ok(())
}
