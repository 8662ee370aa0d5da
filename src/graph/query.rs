//! Graph query shapes and their Cypher renderings
//!
//! Every read and write the memory layer issues is one `GraphQuery` variant.
//! Cypher backends render a variant to a fixed template plus a parameter map;
//! only the similarity search differs between dialects.

use serde_json::{json, Map, Value};

/// Cypher dialect of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Neo4j,
    FalkorDb,
}

/// Endpoint of a merged relation
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub name: String,
    /// Normalized entity type, attached as a label
    pub label: String,
    pub embedding: Vec<f32>,
}

/// Every query the memory layer sends to a graph
#[derive(Debug, Clone, PartialEq)]
pub enum GraphQuery {
    /// Relations touching nodes whose embedding is at least `threshold` similar.
    /// Rows: `[source, source_id, relation, relation_id, destination, destination_id, similarity]`
    SimilarRelations {
        embedding: Vec<f32>,
        threshold: f64,
        limit: usize,
    },
    /// Merge both endpoints and the edge between them. Rows: `[source, relationship, destination]`
    MergeRelation {
        source: NodeSpec,
        destination: NodeSpec,
        relationship: String,
    },
    /// Create both nodes if absent
    EnsureNodes {
        source: String,
        target: String,
        source_embedding: Vec<f32>,
        target_embedding: Vec<f32>,
    },
    /// Delete every edge from `source` to `target`
    DeleteRelationsBetween { source: String, target: String },
    /// Create an edge between two existing nodes. Rows: `[source, relationship, target]`
    CreateRelation {
        source: String,
        target: String,
        relationship: String,
    },
    /// Every edge between two nodes of the user. Rows: `[source, relationship, target]`
    ListRelations { limit: usize },
    /// Detach and delete every node of the user
    DeleteUser,
}

/// Rendered query text with its `$param` bindings
#[derive(Debug, Clone, PartialEq)]
pub struct CypherStatement {
    pub text: String,
    pub params: Map<String, Value>,
}

pub const NEO4J_SIMILARITY_QUERY: &str = "
MATCH (n)
WHERE n.embedding IS NOT NULL AND n.user_id = $user_id
WITH n,
    round(reduce(dot = 0.0, i IN range(0, size(n.embedding)-1) | dot + n.embedding[i] * $n_embedding[i]) /
    (sqrt(reduce(l2 = 0.0, i IN range(0, size(n.embedding)-1) | l2 + n.embedding[i] * n.embedding[i])) *
    sqrt(reduce(l2 = 0.0, i IN range(0, size($n_embedding)-1) | l2 + $n_embedding[i] * $n_embedding[i]))), 4) AS similarity
WHERE similarity >= $threshold
MATCH (n)-[r]->(m)
RETURN n.name AS source, elementId(n) AS source_id, type(r) AS relation, elementId(r) AS relation_id, m.name AS destination, elementId(m) AS destination_id, similarity
UNION
MATCH (n)
WHERE n.embedding IS NOT NULL AND n.user_id = $user_id
WITH n,
    round(reduce(dot = 0.0, i IN range(0, size(n.embedding)-1) | dot + n.embedding[i] * $n_embedding[i]) /
    (sqrt(reduce(l2 = 0.0, i IN range(0, size(n.embedding)-1) | l2 + n.embedding[i] * n.embedding[i])) *
    sqrt(reduce(l2 = 0.0, i IN range(0, size($n_embedding)-1) | l2 + $n_embedding[i] * $n_embedding[i]))), 4) AS similarity
WHERE similarity >= $threshold
MATCH (m)-[r]->(n)
RETURN m.name AS source, elementId(m) AS source_id, type(r) AS relation, elementId(r) AS relation_id, n.name AS destination, elementId(n) AS destination_id, similarity
ORDER BY similarity DESC
LIMIT $limit
";

pub const FALKORDB_SIMILARITY_QUERY: &str = "
MATCH (n)
WHERE n.embedding IS NOT NULL AND n.user_id = $user_id
WITH n,
    reduce(dot = 0.0, i IN range(0, size(n.embedding)-1) | dot + n.embedding[i] * $n_embedding[i]) /
    (sqrt(reduce(l2 = 0.0, i IN range(0, size(n.embedding)-1) | l2 + n.embedding[i] * n.embedding[i])) *
    sqrt(reduce(l2 = 0.0, i IN range(0, size($n_embedding)-1) | l2 + $n_embedding[i] * $n_embedding[i]))) AS similarity
WHERE similarity >= $threshold
MATCH (n)-[r]->(m)
RETURN n.name AS source, id(n) AS source_id, type(r) AS relation, id(r) AS relation_id, m.name AS destination, id(m) AS destination_id, similarity
UNION
MATCH (n)
WHERE n.embedding IS NOT NULL AND n.user_id = $user_id
WITH n,
    reduce(dot = 0.0, i IN range(0, size(n.embedding)-1) | dot + n.embedding[i] * $n_embedding[i]) /
    (sqrt(reduce(l2 = 0.0, i IN range(0, size(n.embedding)-1) | l2 + n.embedding[i] * n.embedding[i])) *
    sqrt(reduce(l2 = 0.0, i IN range(0, size($n_embedding)-1) | l2 + $n_embedding[i] * $n_embedding[i]))) AS similarity
WHERE similarity >= $threshold
MATCH (m)-[r]->(n)
RETURN m.name AS source, id(m) AS source_id, type(r) AS relation, id(r) AS relation_id, n.name AS destination, id(n) AS destination_id, similarity
ORDER BY similarity DESC
LIMIT $limit
";

const ENSURE_NODES_QUERY: &str = "
MERGE (n1 {name: $source, user_id: $user_id})
ON CREATE SET n1.created = timestamp(), n1.embedding = $source_embedding
MERGE (n2 {name: $target, user_id: $user_id})
ON CREATE SET n2.created = timestamp(), n2.embedding = $target_embedding
";

const DELETE_BETWEEN_QUERY: &str = "
MATCH (n1 {name: $source, user_id: $user_id})-[r]->(n2 {name: $target, user_id: $user_id})
DELETE r
";

const LIST_RELATIONS_QUERY: &str = "
MATCH (n {user_id: $user_id})-[r]->(m {user_id: $user_id})
RETURN n.name AS source, type(r) AS relationship, m.name AS target
LIMIT $limit
";

const DELETE_USER_QUERY: &str = "
MATCH (n {user_id: $user_id})
DETACH DELETE n
";

/// Backtick-quote a label or relationship type
pub fn quote_identifier(raw: &str) -> String {
    format!("`{}`", raw.replace('`', "``"))
}

fn embedding_value(embedding: &[f32]) -> Value {
    Value::Array(embedding.iter().map(|x| json!(*x as f64)).collect())
}

fn set_label(variable: &str, label: &str) -> String {
    if label.is_empty() {
        String::new()
    } else {
        format!("SET {}:{}\n", variable, quote_identifier(label))
    }
}

impl GraphQuery {
    /// Render to Cypher; `user_id` is always bound as `$user_id`
    pub fn to_cypher(&self, dialect: Dialect, user_id: &str) -> CypherStatement {
        let mut params = Map::new();
        params.insert("user_id".to_string(), json!(user_id));

        let text = match self {
            GraphQuery::SimilarRelations {
                embedding,
                threshold,
                limit,
            } => {
                params.insert("n_embedding".to_string(), embedding_value(embedding));
                params.insert("threshold".to_string(), json!(threshold));
                params.insert("limit".to_string(), json!(limit));
                match dialect {
                    Dialect::Neo4j => NEO4J_SIMILARITY_QUERY.to_string(),
                    Dialect::FalkorDb => FALKORDB_SIMILARITY_QUERY.to_string(),
                }
            }
            GraphQuery::MergeRelation {
                source,
                destination,
                relationship,
            } => {
                params.insert("source_name".to_string(), json!(source.name));
                params.insert("dest_name".to_string(), json!(destination.name));
                params.insert("source_embedding".to_string(), embedding_value(&source.embedding));
                params.insert("dest_embedding".to_string(), embedding_value(&destination.embedding));
                format!(
                    "
MERGE (n {{name: $source_name, user_id: $user_id}})
ON CREATE SET n.created = timestamp(), n.embedding = $source_embedding
ON MATCH SET n.embedding = $source_embedding
{}MERGE (m {{name: $dest_name, user_id: $user_id}})
ON CREATE SET m.created = timestamp(), m.embedding = $dest_embedding
ON MATCH SET m.embedding = $dest_embedding
{}MERGE (n)-[rel:{}]->(m)
ON CREATE SET rel.created = timestamp()
RETURN n.name AS source, type(rel) AS relationship, m.name AS target
",
                    set_label("n", &source.label),
                    set_label("m", &destination.label),
                    quote_identifier(relationship),
                )
            }
            GraphQuery::EnsureNodes {
                source,
                target,
                source_embedding,
                target_embedding,
            } => {
                params.insert("source".to_string(), json!(source));
                params.insert("target".to_string(), json!(target));
                params.insert("source_embedding".to_string(), embedding_value(source_embedding));
                params.insert("target_embedding".to_string(), embedding_value(target_embedding));
                ENSURE_NODES_QUERY.to_string()
            }
            GraphQuery::DeleteRelationsBetween { source, target } => {
                params.insert("source".to_string(), json!(source));
                params.insert("target".to_string(), json!(target));
                DELETE_BETWEEN_QUERY.to_string()
            }
            GraphQuery::CreateRelation {
                source,
                target,
                relationship,
            } => {
                params.insert("source".to_string(), json!(source));
                params.insert("target".to_string(), json!(target));
                format!(
                    "
MATCH (n1 {{name: $source, user_id: $user_id}}), (n2 {{name: $target, user_id: $user_id}})
CREATE (n1)-[r:{}]->(n2)
SET r.created = timestamp()
RETURN n1.name AS source, type(r) AS relationship, n2.name AS target
",
                    quote_identifier(relationship)
                )
            }
            GraphQuery::ListRelations { limit } => {
                params.insert("limit".to_string(), json!(limit));
                LIST_RELATIONS_QUERY.to_string()
            }
            GraphQuery::DeleteUser => DELETE_USER_QUERY.to_string(),
        };

        CypherStatement { text, params }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            GraphQuery::SimilarRelations { .. } => "similar_relations",
            GraphQuery::MergeRelation { .. } => "merge_relation",
            GraphQuery::EnsureNodes { .. } => "ensure_nodes",
            GraphQuery::DeleteRelationsBetween { .. } => "delete_relations_between",
            GraphQuery::CreateRelation { .. } => "create_relation",
            GraphQuery::ListRelations { .. } => "list_relations",
            GraphQuery::DeleteUser => "delete_user",
        }
    }
}
