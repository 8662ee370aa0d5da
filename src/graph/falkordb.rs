//! FalkorDB over the Redis protocol
//!
//! Each user gets its own graph key, so `GRAPH.QUERY` is always issued
//! against the graph named by the user id. Parameters travel inline in a
//! `CYPHER k=v ...` prefix because the module takes no separate bindings.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Value as RedisValue;
use serde_json::{Map, Value};
use tracing::debug;

use super::query::{CypherStatement, Dialect, GraphQuery};
use super::{GraphStore, Row};
use crate::errors::{MemoryError, Result};

/// FalkorDB client over a multiplexed redis connection
#[derive(Clone)]
pub struct FalkorDbStore {
    connection: MultiplexedConnection,
}

impl FalkorDbStore {
    /// Connect to e.g. `redis://localhost:6379`
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self { connection })
    }

    /// Run a statement against the graph named `graph`
    pub async fn execute(&self, graph: &str, statement: &CypherStatement) -> Result<Vec<Row>> {
        let mut connection = self.connection.clone();
        let reply: RedisValue = graph_query_cmd(graph, statement)
            .query_async(&mut connection)
            .await?;

        rows_from_reply(reply)
    }
}

/// `GRAPH.QUERY <graph> "CYPHER ... <text>"`
pub fn graph_query_cmd(graph: &str, statement: &CypherStatement) -> redis::Cmd {
    let mut cmd = redis::cmd("GRAPH.QUERY");
    cmd.arg(graph).arg(inline_params(statement));
    cmd
}

#[async_trait]
impl GraphStore for FalkorDbStore {
    async fn run(&self, user_id: &str, query: &GraphQuery) -> Result<Vec<Row>> {
        let statement = query.to_cypher(Dialect::FalkorDb, user_id);
        debug!("falkordb {} on graph {}", query.kind(), user_id);
        self.execute(user_id, &statement).await
    }

    fn provider(&self) -> &'static str {
        "falkordb"
    }
}

/// Prefix the query with `CYPHER name=literal ...`
pub fn inline_params(statement: &CypherStatement) -> String {
    if statement.params.is_empty() {
        return statement.text.clone();
    }

    let bindings: Vec<String> = statement
        .params
        .iter()
        .map(|(name, value)| format!("{}={}", name, cypher_literal(value)))
        .collect();

    format!("CYPHER {} {}", bindings.join(" "), statement.text)
}

/// Render a JSON value as a Cypher literal
pub fn cypher_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_string(s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(cypher_literal).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => map_literal(map),
    }
}

fn map_literal(map: &Map<String, Value>) -> String {
    let inner: Vec<String> = map
        .iter()
        .map(|(k, v)| format!("{}: {}", super::query::quote_identifier(k), cypher_literal(v)))
        .collect();
    format!("{{{}}}", inner.join(", "))
}

fn quote_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Extract result rows from a verbose `GRAPH.QUERY` reply
///
/// A reply with a result set is `[header, rows, statistics]`; write-only
/// queries return just `[statistics]`.
pub fn rows_from_reply(reply: RedisValue) -> Result<Vec<Row>> {
    let sections = match reply {
        RedisValue::Bulk(sections) => sections,
        other => {
            return Err(MemoryError::GraphError(format!(
                "unexpected GRAPH.QUERY reply: {:?}",
                other
            )))
        }
    };

    match sections.len() {
        1 => Ok(Vec::new()),
        3 => {
            let rows = match sections.into_iter().nth(1) {
                Some(RedisValue::Bulk(rows)) => rows,
                Some(RedisValue::Nil) | None => return Ok(Vec::new()),
                Some(other) => {
                    return Err(MemoryError::GraphError(format!(
                        "unexpected result set: {:?}",
                        other
                    )))
                }
            };

            rows.into_iter()
                .map(|row| match row {
                    RedisValue::Bulk(cells) => Ok(cells.into_iter().map(redis_to_json).collect()),
                    other => Err(MemoryError::GraphError(format!(
                        "unexpected row: {:?}",
                        other
                    ))),
                })
                .collect()
        }
        n => Err(MemoryError::GraphError(format!(
            "unexpected GRAPH.QUERY reply with {} sections",
            n
        ))),
    }
}

/// Convert a reply cell to JSON. Bulk strings stay strings, doubles
/// included; readers that want a number parse the text.
pub fn redis_to_json(value: RedisValue) -> Value {
    match value {
        RedisValue::Nil => Value::Null,
        RedisValue::Int(i) => Value::from(i),
        RedisValue::Data(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        RedisValue::Bulk(items) => Value::Array(items.into_iter().map(redis_to_json).collect()),
        RedisValue::Status(s) => Value::String(s),
        RedisValue::Okay => Value::String("OK".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RelationTriple, SearchCandidate};
    use serde_json::json;

    fn data(s: &str) -> RedisValue {
        RedisValue::Data(s.as_bytes().to_vec())
    }

    #[test]
    fn test_cypher_literals() {
        assert_eq!(cypher_literal(&json!(null)), "null");
        assert_eq!(cypher_literal(&json!(true)), "true");
        assert_eq!(cypher_literal(&json!(100)), "100");
        assert_eq!(cypher_literal(&json!(0.7)), "0.7");
        assert_eq!(cypher_literal(&json!("acme")), "\"acme\"");
        assert_eq!(cypher_literal(&json!([0.5, 1])), "[0.5, 1]");
    }

    #[test]
    fn test_string_literal_escaping() {
        assert_eq!(cypher_literal(&json!("say \"hi\"")), r#""say \"hi\"""#);
        assert_eq!(cypher_literal(&json!("a\\b")), r#""a\\b""#);
        assert_eq!(cypher_literal(&json!("x\ny")), r#""x\ny""#);
    }

    #[test]
    fn test_inline_params() {
        let mut params = Map::new();
        params.insert("user_id".to_string(), json!("u1"));
        params.insert("limit".to_string(), json!(5));
        let stmt = CypherStatement {
            text: "MATCH (n {user_id: $user_id}) RETURN n LIMIT $limit".to_string(),
            params,
        };

        let rendered = inline_params(&stmt);
        assert!(rendered.starts_with("CYPHER "));
        assert!(rendered.contains("user_id=\"u1\""));
        assert!(rendered.contains("limit=5"));
        assert!(rendered.ends_with("LIMIT $limit"));
    }

    #[test]
    fn test_rows_from_reply() {
        let reply = RedisValue::Bulk(vec![
            RedisValue::Bulk(vec![data("source"), data("relationship"), data("target")]),
            RedisValue::Bulk(vec![
                RedisValue::Bulk(vec![data("u1"), data("works_at"), data("acme")]),
                RedisValue::Bulk(vec![data("u1"), data("lives_in"), data("paris")]),
            ]),
            RedisValue::Bulk(vec![data("Query internal execution time: 0.1 milliseconds")]),
        ]);

        let rows = rows_from_reply(reply).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![json!("u1"), json!("works_at"), json!("acme")]);
    }

    #[test]
    fn test_write_only_reply_has_no_rows() {
        let reply = RedisValue::Bulk(vec![RedisValue::Bulk(vec![data("Nodes deleted: 2")])]);
        assert!(rows_from_reply(reply).unwrap().is_empty());
    }

    #[test]
    fn test_unexpected_reply() {
        assert!(rows_from_reply(RedisValue::Okay).is_err());
    }

    #[test]
    fn test_redis_to_json() {
        assert_eq!(redis_to_json(RedisValue::Int(3)), json!(3));
        assert_eq!(redis_to_json(RedisValue::Nil), json!(null));
        assert_eq!(redis_to_json(data("0.8123")), json!("0.8123"));
        assert_eq!(redis_to_json(data("acme")), json!("acme"));
        assert_eq!(redis_to_json(data("42")), json!("42"));
    }

    #[test]
    fn test_decimal_looking_names_survive() {
        let reply = RedisValue::Bulk(vec![
            RedisValue::Bulk(vec![data("source"), data("relationship"), data("target")]),
            RedisValue::Bulk(vec![RedisValue::Bulk(vec![
                data("u1"),
                data("prefers"),
                data("2.50"),
            ])]),
            RedisValue::Bulk(vec![data("Query internal execution time: 0.1 milliseconds")]),
        ]);

        let rows = rows_from_reply(reply).unwrap();
        let triple = RelationTriple::from_row(&rows[0]).unwrap();
        assert_eq!(triple.target, "2.50");
    }

    #[test]
    fn test_similarity_column_parses_from_text() {
        let row: Vec<Value> = ["u1", "1", "works_at", "7", "acme", "2", "0.8123"]
            .iter()
            .map(|cell| redis_to_json(data(cell)))
            .collect();

        let candidate = SearchCandidate::from_row(&row).unwrap();
        assert_eq!(candidate.destination, "acme");
        assert_eq!(candidate.similarity, Some(0.8123));
    }

    #[test]
    fn test_query_targets_the_user_graph() {
        let statement = GraphQuery::ListRelations { limit: 10 }.to_cypher(Dialect::FalkorDb, "alice");
        let cmd = graph_query_cmd("alice", &statement);

        let args: Vec<Vec<u8>> = cmd
            .args_iter()
            .map(|arg| match arg {
                redis::Arg::Simple(bytes) => bytes.to_vec(),
                redis::Arg::Cursor => Vec::new(),
            })
            .collect();

        assert_eq!(args.len(), 3);
        assert_eq!(args[0], b"GRAPH.QUERY".to_vec());
        assert_eq!(args[1], b"alice".to_vec());

        let query = String::from_utf8(args[2].clone()).unwrap();
        assert!(query.starts_with("CYPHER "));
        assert!(query.contains("user_id=\"alice\""));
        assert!(query.ends_with(&statement.text));
    }
}
