//! MCP server exposing a Neo4j graph database as agent tools.
//!
//! A single shared connection is owned by [`ConnectionManager`]; every
//! statement runs through [`QueryExecutor`], which bounds concurrency with a
//! [`ConcurrencyGate`](database::ConcurrencyGate) and applies a per-statement
//! timeout.
//!
//! # Example
//!
//! ```no_run
//! use neo4j_mcp_server::{
//!     config::ServerConfig,
//!     database::{ConnectionManager, Neo4jConnector},
//!     protocol::McpServerBuilder,
//!     server::{McpHandler, ServerStateBuilder},
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::default();
//!
//!     // Starts disconnected; the connect_neo4j tool establishes the connection
//!     let connections = ConnectionManager::new(Arc::new(Neo4jConnector::new(
//!         config.executor.max_concurrency,
//!     )));
//!
//!     let state = Arc::new(
//!         ServerStateBuilder::new()
//!             .config(config)
//!             .connection_manager(connections)
//!             .build()?,
//!     );
//!
//!     let server = McpServerBuilder::new()
//!         .handler(McpHandler::new(state))
//!         .build()?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod protocol;
pub mod security;
pub mod server;
pub mod tools;

pub use config::{
    ConnectionConfig, CredentialResolver, CredentialSource, ExecutorConfig, ServerConfig,
};
pub use database::{
    ConnectOutcome, ConnectionManager, ConnectionMetadata, DisconnectOutcome, Neo4jConnector,
    QueryExecutor, sanitize_uri,
};
pub use error::{McpError, Result};
pub use protocol::{McpServer, McpServerBuilder};
pub use security::CypherValidator;
pub use server::{HealthReporter, McpHandler, ServerState, ServerStateBuilder};
