//! Neo4j over the HTTP transactional endpoint

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use super::query::{CypherStatement, Dialect, GraphQuery};
use super::{GraphStore, Row};
use crate::errors::{MemoryError, Result};

/// Neo4j client posting to `/db/{database}/tx/commit`
#[derive(Debug, Clone)]
pub struct Neo4jStore {
    client: Client,
    base_url: String,
    database: String,
    username: Option<String>,
    password: Option<String>,
}

impl Neo4jStore {
    pub fn new(
        base_url: &str,
        database: &str,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(MemoryError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            database: database.to_string(),
            username,
            password,
        })
    }

    /// Run a single statement in an auto-commit transaction
    pub async fn execute(&self, statement: &CypherStatement) -> Result<Vec<Row>> {
        let url = format!("{}/db/{}/tx/commit", self.base_url, self.database);

        let request = CommitRequest {
            statements: vec![StatementRequest {
                statement: &statement.text,
                parameters: &statement.params,
                result_data_contents: ["row"],
            }],
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(user) = &self.username {
            builder = builder.basic_auth(user, self.password.as_ref());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| MemoryError::GraphError(format!("Failed to reach Neo4j: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MemoryError::GraphError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: CommitResponse = response
            .json()
            .await
            .map_err(|e| MemoryError::GraphError(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = body.errors.first() {
            return Err(MemoryError::GraphError(format!(
                "{}: {}",
                error.code, error.message
            )));
        }

        Ok(body
            .results
            .into_iter()
            .flat_map(|result| result.data.into_iter().map(|d| d.row))
            .collect())
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn run(&self, user_id: &str, query: &GraphQuery) -> Result<Vec<Row>> {
        let statement = query.to_cypher(Dialect::Neo4j, user_id);
        debug!("neo4j {} for user {}", query.kind(), user_id);
        self.execute(&statement).await
    }

    fn provider(&self) -> &'static str {
        "neo4j"
    }
}

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    statements: Vec<StatementRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatementRequest<'a> {
    statement: &'a str,
    parameters: &'a Map<String, Value>,
    result_data_contents: [&'static str; 1],
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<Neo4jError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    data: Vec<RowData>,
}

#[derive(Debug, Deserialize)]
struct RowData {
    #[serde(default)]
    row: Row,
}

#[derive(Debug, Deserialize)]
struct Neo4jError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}
