//! Knowledge graph data model
//!
//! Entities are named nodes scoped to a user, relations are directed typed
//! edges between two entities of the same user. Names, types and relationship
//! labels are stored normalized (lowercase, spaces replaced by underscores).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{MemoryError, Result};

/// Normalize a name, type or relationship label for storage
pub fn normalize(raw: &str) -> String {
    raw.to_lowercase().replace(' ', "_")
}

/// Scope of every public memory operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filters {
    pub user_id: String,
}

impl Filters {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// A named node in a user's graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    /// Labels attached to the node; a node gains a label per type it was merged with
    pub labels: Vec<String>,
    pub embedding: Option<Vec<f32>>,
    pub user_id: String,
    /// Milliseconds since epoch, set once on creation
    pub created: i64,
}

/// A directed typed edge between two entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub relationship: String,
    pub target: String,
    pub created: i64,
}

/// A (source, relationship, target) fact as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationTriple {
    pub source: String,
    pub relationship: String,
    pub target: String,
}

impl RelationTriple {
    pub fn new(
        source: impl Into<String>,
        relationship: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            relationship: relationship.into(),
            target: target.into(),
        }
    }

    /// Build from a positional `[source, relationship, target]` row
    pub fn from_row(row: &[Value]) -> Result<Self> {
        Ok(Self {
            source: string_at(row, 0)?,
            relationship: string_at(row, 1)?,
            target: string_at(row, 2)?,
        })
    }
}

/// Relation triple produced by the relation extraction tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRelation {
    pub source: String,
    pub relation: String,
    pub destination: String,
}

/// Existing relation retrieved by embedding similarity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub source: String,
    pub relationship: String,
    pub destination: String,
    pub similarity: Option<f64>,
}

impl SearchCandidate {
    /// Decode a similarity-query row:
    /// `[source, source_id, relation, relation_id, destination, destination_id, similarity]`
    pub fn from_row(row: &[Value]) -> Result<Self> {
        let similarity = row.get(6).and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        });

        Ok(Self {
            source: string_at(row, 0)?,
            relationship: string_at(row, 2)?,
            destination: string_at(row, 4)?,
            similarity,
        })
    }

    /// The three tokens indexed by the lexical reranker
    pub fn tokens(&self) -> Vec<String> {
        vec![
            self.source.clone(),
            self.relationship.clone(),
            self.destination.clone(),
        ]
    }
}

/// Entity name → entity type, in extraction order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityTypeMap {
    entries: Vec<(String, String)>,
}

impl EntityTypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the type of an entity, keeping its first position
    pub fn insert(&mut self, entity: impl Into<String>, entity_type: impl Into<String>) {
        let entity = entity.into();
        let entity_type = entity_type.into();
        match self.entries.iter_mut().find(|(name, _)| *name == entity) {
            Some((_, existing)) => *existing = entity_type,
            None => self.entries.push((entity, entity_type)),
        }
    }

    pub fn get(&self, entity: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == entity)
            .map(|(_, t)| t.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn string_at(row: &[Value], index: usize) -> Result<String> {
    match row.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) | None => Err(MemoryError::GraphError(format!(
            "row has no value at position {}: {:?}",
            index, row
        ))),
        Some(other) => Ok(other.to_string()),
    }
}
