//! Process-local graph store
//!
//! Interprets `GraphQuery` directly against per-user partitions with the same
//! row shapes the Cypher backends return. Nothing is persisted.

use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::query::{GraphQuery, NodeSpec};
use super::{GraphStore, Row};
use crate::embedding::cosine_similarity;
use crate::errors::Result;
use crate::types::{Entity, Relation};

#[derive(Debug, Default, Clone)]
struct UserGraph {
    nodes: BTreeMap<String, Entity>,
    edges: Vec<Relation>,
}

impl UserGraph {
    fn merge_node(&mut self, user_id: &str, spec: &NodeSpec, now: i64) {
        let node = self
            .nodes
            .entry(spec.name.clone())
            .or_insert_with(|| Entity {
                name: spec.name.clone(),
                labels: Vec::new(),
                embedding: None,
                user_id: user_id.to_string(),
                created: now,
            });
        node.embedding = Some(spec.embedding.clone());
        if !spec.label.is_empty() && !node.labels.contains(&spec.label) {
            node.labels.push(spec.label.clone());
        }
    }

    fn ensure_node(&mut self, user_id: &str, name: &str, embedding: &[f32], now: i64) {
        self.nodes.entry(name.to_string()).or_insert_with(|| Entity {
            name: name.to_string(),
            labels: Vec::new(),
            embedding: Some(embedding.to_vec()),
            user_id: user_id.to_string(),
            created: now,
        });
    }

    fn similar_relations(&self, embedding: &[f32], threshold: f64, limit: usize) -> Vec<Row> {
        let mut hits: Vec<(Row, f64)> = Vec::new();

        for node in self.nodes.values() {
            let Some(stored) = &node.embedding else {
                continue;
            };
            let similarity = round4(cosine_similarity(stored, embedding));
            if similarity < threshold {
                continue;
            }

            for (index, edge) in self.edges.iter().enumerate() {
                if edge.source == node.name || edge.target == node.name {
                    let row = vec![
                        json!(edge.source),
                        json!(edge.source),
                        json!(edge.relationship),
                        json!(index),
                        json!(edge.target),
                        json!(edge.target),
                        json!(similarity),
                    ];
                    // UNION semantics: identical rows collapse
                    if !hits.iter().any(|(existing, _)| *existing == row) {
                        hits.push((row, similarity));
                    }
                }
            }
        }

        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.into_iter().take(limit).map(|(row, _)| row).collect()
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn triple_row(source: &str, relationship: &str, target: &str) -> Row {
    vec![json!(source), json!(relationship), json!(target)]
}

/// In-memory graph keyed by user id
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    graphs: RwLock<HashMap<String, UserGraph>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities of a user, ordered by name
    pub async fn entities(&self, user_id: &str) -> Vec<Entity> {
        let graphs = self.graphs.read().await;
        graphs
            .get(user_id)
            .map(|g| g.nodes.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Relations of a user in creation order
    pub async fn relations(&self, user_id: &str) -> Vec<Relation> {
        let graphs = self.graphs.read().await;
        graphs
            .get(user_id)
            .map(|g| g.edges.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn run(&self, user_id: &str, query: &GraphQuery) -> Result<Vec<Row>> {
        let now = chrono::Utc::now().timestamp_millis();

        if let GraphQuery::SimilarRelations {
            embedding,
            threshold,
            limit,
        } = query
        {
            let graphs = self.graphs.read().await;
            return Ok(graphs
                .get(user_id)
                .map(|g| g.similar_relations(embedding, *threshold, *limit))
                .unwrap_or_default());
        }

        if let GraphQuery::ListRelations { limit } = query {
            let graphs = self.graphs.read().await;
            return Ok(graphs
                .get(user_id)
                .map(|g| {
                    g.edges
                        .iter()
                        .take(*limit)
                        .map(|e| triple_row(&e.source, &e.relationship, &e.target))
                        .collect()
                })
                .unwrap_or_default());
        }

        let mut graphs = self.graphs.write().await;

        if let GraphQuery::DeleteUser = query {
            graphs.remove(user_id);
            return Ok(Vec::new());
        }

        let graph = graphs.entry(user_id.to_string()).or_default();

        let rows = match query {
            GraphQuery::MergeRelation {
                source,
                destination,
                relationship,
            } => {
                graph.merge_node(user_id, source, now);
                graph.merge_node(user_id, destination, now);

                let exists = graph.edges.iter().any(|e| {
                    e.source == source.name
                        && e.target == destination.name
                        && e.relationship == *relationship
                });
                if !exists {
                    graph.edges.push(Relation {
                        source: source.name.clone(),
                        relationship: relationship.clone(),
                        target: destination.name.clone(),
                        created: now,
                    });
                }
                vec![triple_row(&source.name, relationship, &destination.name)]
            }
            GraphQuery::EnsureNodes {
                source,
                target,
                source_embedding,
                target_embedding,
            } => {
                graph.ensure_node(user_id, source, source_embedding, now);
                graph.ensure_node(user_id, target, target_embedding, now);
                Vec::new()
            }
            GraphQuery::DeleteRelationsBetween { source, target } => {
                graph
                    .edges
                    .retain(|e| !(e.source == *source && e.target == *target));
                Vec::new()
            }
            GraphQuery::CreateRelation {
                source,
                target,
                relationship,
            } => {
                if graph.nodes.contains_key(source) && graph.nodes.contains_key(target) {
                    graph.edges.push(Relation {
                        source: source.clone(),
                        relationship: relationship.clone(),
                        target: target.clone(),
                        created: now,
                    });
                    vec![triple_row(source, relationship, target)]
                } else {
                    Vec::new()
                }
            }
            GraphQuery::SimilarRelations { .. }
            | GraphQuery::ListRelations { .. }
            | GraphQuery::DeleteUser => Vec::new(),
        };

        Ok(rows)
    }

    fn provider(&self) -> &'static str {
        "memory"
    }
}
