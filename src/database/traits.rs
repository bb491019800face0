//! Graph driver traits.

use crate::config::ConnectionConfig;
use crate::error::DbResult;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Statement parameters keyed by name.
pub type Parameters = Map<String, Value>;

/// One result record as a map of column name to value.
pub type Record = Map<String, Value>;

/// Opens authenticated drivers.
///
/// Implementations: [`Neo4jConnector`](crate::database::Neo4jConnector).
#[async_trait]
pub trait Connector: Send + Sync {
    /// Creates a driver for `config`. Does not check reachability.
    async fn open(&self, config: &ConnectionConfig) -> DbResult<Arc<dyn GraphDriver>>;
}

/// A live, authenticated connection to a graph database.
#[async_trait]
pub trait GraphDriver: Send + Sync {
    /// Returns the driver name (e.g., "neo4j").
    fn name(&self) -> &'static str;

    /// Runs a lightweight round trip to confirm the server is reachable and
    /// the credentials are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::ConnectionFailed`](crate::error::DatabaseError::ConnectionFailed)
    /// if the server cannot be reached or rejects authentication.
    async fn verify_connectivity(&self) -> DbResult<()>;

    /// Opens a session bound to this driver.
    ///
    /// The session is closed when the returned box is dropped.
    async fn open_session(&self) -> DbResult<Box<dyn GraphSession>>;

    /// Drops the driver's hold on its connection pool. Sessions already open
    /// keep their connection until they are dropped; opening another session
    /// afterwards fails with
    /// [`DatabaseError::ConnectionClosed`](crate::error::DatabaseError::ConnectionClosed).
    async fn close(&self);
}

/// A unit of work against a [`GraphDriver`].
#[async_trait]
pub trait GraphSession: Send {
    /// Runs `statement` and collects at most `max_records` records.
    ///
    /// Returns the collected records and whether the stream had more.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::QueryFailed`](crate::error::DatabaseError::QueryFailed)
    /// for syntax errors and database-reported failures.
    async fn run(
        &mut self,
        statement: &str,
        parameters: &Parameters,
        max_records: usize,
    ) -> DbResult<(Vec<Record>, bool)>;
}
