//! Neo4j driver using `neo4rs` (Bolt, pooled connections).

use crate::config::ConnectionConfig;
use crate::database::traits::{Connector, GraphDriver, GraphSession, Parameters, Record};
use crate::database::uri::redact;
use crate::error::{DatabaseError, DbResult};
use async_trait::async_trait;
use neo4rs::{BoltList, BoltMap, BoltNull, BoltString, BoltType, ConfigBuilder, Graph, Query, query};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Opens [`Neo4jDriver`]s.
pub struct Neo4jConnector {
    max_connections: usize,
}

impl Neo4jConnector {
    /// `max_connections` sizes the Bolt pool; it should be at least the gate capacity.
    pub fn new(max_connections: usize) -> Self {
        Self {
            max_connections: max_connections.max(1),
        }
    }
}

impl Default for Neo4jConnector {
    fn default() -> Self {
        Self::new(16)
    }
}

#[async_trait]
impl Connector for Neo4jConnector {
    async fn open(&self, config: &ConnectionConfig) -> DbResult<Arc<dyn GraphDriver>> {
        info!(
            "Opening Neo4j driver for {} (pool size {})",
            config.sanitized_uri(),
            self.max_connections
        );

        let neo_config = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.username.as_str())
            .password(config.password.as_str())
            .max_connections(self.max_connections)
            .build()
            .map_err(|e| DatabaseError::ConnectionFailed(redact(&e.to_string(), config)))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(redact(&e.to_string(), config)))?;

        Ok(Arc::new(Neo4jDriver {
            graph: RwLock::new(Some(Arc::new(graph))),
            config: config.clone(),
        }))
    }
}

/// Neo4j database driver.
///
/// Owns one reference to the Bolt pool; sessions hold their own, so the pool
/// closes once the driver is closed and the last session is dropped.
pub struct Neo4jDriver {
    graph: RwLock<Option<Arc<Graph>>>,
    config: ConnectionConfig,
}

#[async_trait]
impl GraphDriver for Neo4jDriver {
    fn name(&self) -> &'static str {
        "neo4j"
    }

    #[instrument(skip(self), fields(db = "neo4j"))]
    async fn verify_connectivity(&self) -> DbResult<()> {
        let mut stream = self
            .graph()?
            .execute(query("RETURN 1 AS test"))
            .await
            .map_err(|e| self.connection_error(e))?;

        let row = stream
            .next()
            .await
            .map_err(|e| self.connection_error(e))?
            .ok_or_else(|| {
                DatabaseError::ConnectionFailed("connectivity check returned no rows".into())
            })?;

        match row.get::<i64>("test") {
            Ok(1) => Ok(()),
            _ => Err(DatabaseError::ConnectionFailed(
                "connectivity check returned an unexpected value".into(),
            )),
        }
    }

    async fn open_session(&self) -> DbResult<Box<dyn GraphSession>> {
        Ok(Box::new(Neo4jSession {
            graph: self.graph()?,
            config: self.config.clone(),
        }))
    }

    async fn close(&self) {
        if self.graph.write().take().is_some() {
            debug!("Released Neo4j pool for {}", self.config.sanitized_uri());
        }
    }
}

impl Neo4jDriver {
    fn graph(&self) -> DbResult<Arc<Graph>> {
        self.graph
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(DatabaseError::ConnectionClosed)
    }

    fn connection_error(&self, e: neo4rs::Error) -> DatabaseError {
        DatabaseError::ConnectionFailed(redact(&e.to_string(), &self.config))
    }
}

/// Session over the shared pool; the pooled Bolt connection is held by the
/// row stream and returned when the session is dropped.
struct Neo4jSession {
    graph: Arc<Graph>,
    config: ConnectionConfig,
}

impl Neo4jSession {
    fn query_error(&self, e: impl std::fmt::Display) -> DatabaseError {
        DatabaseError::QueryFailed(redact(&e.to_string(), &self.config))
    }
}

#[async_trait]
impl GraphSession for Neo4jSession {
    #[instrument(skip(self, statement, parameters), fields(db = "neo4j"))]
    async fn run(
        &mut self,
        statement: &str,
        parameters: &Parameters,
        max_records: usize,
    ) -> DbResult<(Vec<Record>, bool)> {
        let q = build_query(statement, parameters);

        let mut stream = self
            .graph
            .execute(q)
            .await
            .map_err(|e| self.query_error(e))?;

        let mut records = Vec::new();
        let mut truncated = false;

        while let Some(row) = stream.next().await.map_err(|e| self.query_error(e))? {
            if records.len() == max_records {
                truncated = true;
                break;
            }
            let record: Record = row.to().map_err(|e| self.query_error(e))?;
            records.push(record);
        }

        debug!("Collected {} records (truncated: {})", records.len(), truncated);
        Ok((records, truncated))
    }
}

fn build_query(statement: &str, parameters: &Parameters) -> Query {
    parameters
        .iter()
        .fold(query(statement), |q, (key, value)| {
            q.param(key, json_to_bolt(value))
        })
}

/// Converts a JSON parameter into its Bolt representation.
fn json_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::from(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::from(i),
            None => BoltType::from(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => BoltType::from(s.as_str()),
        Value::Array(items) => BoltType::List(BoltList {
            value: items.iter().map(json_to_bolt).collect(),
        }),
        Value::Object(map) => BoltType::Map(BoltMap {
            value: map
                .iter()
                .map(|(k, v)| (BoltString::from(k.as_str()), json_to_bolt(v)))
                .collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_scalars_to_bolt() {
        assert!(matches!(json_to_bolt(&json!(null)), BoltType::Null(_)));
        assert!(matches!(json_to_bolt(&json!(true)), BoltType::Boolean(_)));
        assert!(matches!(json_to_bolt(&json!(42)), BoltType::Integer(_)));
        assert!(matches!(json_to_bolt(&json!(0.5)), BoltType::Float(_)));
        assert!(matches!(json_to_bolt(&json!("x")), BoltType::String(_)));
    }

    #[test]
    fn test_json_collections_to_bolt() {
        match json_to_bolt(&json!(["a", "b"])) {
            BoltType::List(list) => assert_eq!(list.value.len(), 2),
            other => panic!("expected list, got {:?}", other),
        }

        match json_to_bolt(&json!({"name": "Alice", "age": 30})) {
            BoltType::Map(map) => assert_eq!(map.value.len(), 2),
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_connector_pool_size_is_positive() {
        let connector = Neo4jConnector::new(0);
        assert_eq!(connector.max_connections, 1);
    }

    #[tokio::test]
    async fn test_closed_driver_releases_pool() {
        use crate::config::CredentialSource;

        // Pool creation is lazy, so no server is needed to open the driver.
        let config = ConnectionConfig::new(
            "bolt://127.0.0.1:7687",
            "neo4j",
            "secret",
            CredentialSource::Manual,
        );
        let driver = Neo4jConnector::new(2).open(&config).await.unwrap();
        assert!(driver.open_session().await.is_ok());

        driver.close().await;
        assert!(matches!(
            driver.open_session().await,
            Err(DatabaseError::ConnectionClosed)
        ));
        assert!(matches!(
            driver.verify_connectivity().await,
            Err(DatabaseError::ConnectionClosed)
        ));
    }
}
