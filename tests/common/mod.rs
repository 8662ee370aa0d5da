//! Shared test doubles for the graph memory integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use kgmemory::embedding::Embedder;
use kgmemory::graph::{GraphQuery, GraphStore, InMemoryGraphStore, Row};
use kgmemory::llm::tools::{
    ADD_GRAPH_MEMORY, ESTABLISH_RELATIONSHIPS, EXTRACT_ENTITIES, NOOP, UPDATE_GRAPH_MEMORY,
};
use kgmemory::llm::{LlmClient, ToolSchema};
use kgmemory::types::{ChatMessage, LlmResponse, ToolCall};
use kgmemory::{Config, GraphMemory, MemoryError, Result};

/// One recorded `generate` call
#[derive(Debug, Clone)]
pub struct Request {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSchema>,
}

/// LLM replaying queued responses in order
#[derive(Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<LlmResponse>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(&self, messages: &[ChatMessage], tools: &[ToolSchema]) -> Result<LlmResponse> {
        self.requests.lock().unwrap().push(Request {
            messages: messages.to_vec(),
            tools: tools.to_vec(),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| MemoryError::LlmApiError("script exhausted".to_string()))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// One-hot embeddings for a fixed vocabulary; anything else shares the last axis
pub struct TableEmbedder {
    axes: HashMap<String, usize>,
    dimensions: usize,
}

impl TableEmbedder {
    pub fn new(vocabulary: &[&str]) -> Self {
        let axes = vocabulary
            .iter()
            .enumerate()
            .map(|(i, word)| (word.to_string(), i))
            .collect();
        Self {
            axes,
            dimensions: vocabulary.len() + 1,
        }
    }
}

#[async_trait]
impl Embedder for TableEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = kgmemory::types::normalize(text);
        let axis = self.axes.get(&key).copied().unwrap_or(self.dimensions - 1);
        let mut vector = vec![0.0; self.dimensions];
        vector[axis] = 1.0;
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        "table"
    }
}

/// Embedder that always fails
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(MemoryError::EmbeddingError("embedding service down".to_string()))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// In-memory store whose edge creation never matches
pub struct RejectingCreates(pub InMemoryGraphStore);

#[async_trait]
impl GraphStore for RejectingCreates {
    async fn run(&self, user_id: &str, query: &GraphQuery) -> Result<Vec<Row>> {
        match query {
            GraphQuery::CreateRelation { .. } => Ok(Vec::new()),
            other => self.0.run(user_id, other).await,
        }
    }

    fn provider(&self) -> &'static str {
        "rejecting"
    }
}

pub fn vocabulary() -> TableEmbedder {
    TableEmbedder::new(&["u1", "acme", "beta", "paris", "pizza"])
}

pub fn memory_with(
    graph: Arc<dyn GraphStore>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<ScriptedLlm>,
) -> GraphMemory {
    GraphMemory::with_components(Config::default(), graph, embedder, llm)
}

pub fn entities(pairs: &[(&str, &str)]) -> LlmResponse {
    let items: Vec<Value> = pairs
        .iter()
        .map(|(entity, entity_type)| json!({"entity": entity, "entity_type": entity_type}))
        .collect();
    LlmResponse::with_tool_calls(vec![ToolCall::new(
        EXTRACT_ENTITIES,
        json!({ "entities": items }),
    )])
}

pub fn relations(triples: &[(&str, &str, &str)]) -> LlmResponse {
    let items: Vec<Value> = triples
        .iter()
        .map(|(s, r, d)| json!({"source": s, "relation": r, "destination": d}))
        .collect();
    LlmResponse::with_tool_calls(vec![ToolCall::new(
        ESTABLISH_RELATIONSHIPS,
        json!({ "entities": items }),
    )])
}

pub fn decisions(calls: Vec<ToolCall>) -> LlmResponse {
    LlmResponse::with_tool_calls(calls)
}

pub fn add_call(
    source: &str,
    relationship: &str,
    destination: &str,
    source_type: &str,
    destination_type: &str,
) -> ToolCall {
    ToolCall::new(
        ADD_GRAPH_MEMORY,
        json!({
            "source": source,
            "destination": destination,
            "relationship": relationship,
            "source_type": source_type,
            "destination_type": destination_type
        }),
    )
}

pub fn update_call(
    source: &str,
    relationship: &str,
    destination: &str,
    previous_destination: Option<&str>,
) -> ToolCall {
    ToolCall::new(
        UPDATE_GRAPH_MEMORY,
        json!({
            "source": source,
            "destination": destination,
            "relationship": relationship,
            "previous_destination": previous_destination
        }),
    )
}

pub fn noop_call() -> ToolCall {
    ToolCall::new(NOOP, json!({}))
}

/// Script for "My name is Alice and I work at Acme"
pub fn works_at_acme_script() -> Vec<LlmResponse> {
    vec![
        entities(&[("u1", "person"), ("Acme", "organization")]),
        relations(&[("u1", "works_at", "Acme")]),
        decisions(vec![add_call("u1", "works_at", "Acme", "person", "organization")]),
    ]
}
