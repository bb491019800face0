//! Database layer.
//!
//! A single [`ConnectionManager`] owns the live Neo4j handle; every statement
//! runs through [`QueryExecutor::execute`], which bounds concurrency with a
//! [`ConcurrencyGate`] and each call with a timeout. The concrete Bolt driver
//! sits behind the [`Connector`] / [`GraphDriver`] / [`GraphSession`] traits.

pub mod connection;
pub mod executor;
pub mod gate;
pub mod metrics;
#[cfg(test)]
pub mod mock;
pub mod neo4j;
pub mod result;
pub mod traits;
pub mod uri;

pub use connection::{
    ConnectOutcome, ConnectionHandle, ConnectionManager, ConnectionMetadata, DisconnectOutcome,
};
pub use executor::QueryExecutor;
pub use gate::{ConcurrencyGate, GatePermit};
pub use metrics::{ExecutorMetrics, ExecutorMetricsSnapshot};
pub use neo4j::{Neo4jConnector, Neo4jDriver};
pub use result::{ExecutionRequest, ExecutionResult};
pub use traits::{Connector, GraphDriver, GraphSession, Parameters, Record};
pub use uri::sanitize_uri;
