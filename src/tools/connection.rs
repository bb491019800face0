//! Connection lifecycle tools.

use crate::config::{ConnectionConfig, CredentialSource};
use crate::database::ConnectionManager;
use crate::error::Result;
use crate::protocol::{CallToolResult, Tool};
use crate::tools::registry::{ToolHandler, parse_args};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

#[derive(Deserialize)]
struct ConnectArgs {
    uri: String,
    username: String,
    password: String,
    #[serde(default)]
    force: bool,
}

/// Connects with caller-supplied credentials, optionally replacing a live connection.
pub struct ConnectTool {
    connections: ConnectionManager,
}

impl ConnectTool {
    pub fn new(connections: ConnectionManager) -> Self {
        Self { connections }
    }
}

#[async_trait]
impl ToolHandler for ConnectTool {
    fn definition(&self) -> Tool {
        crate::define_tool! {
            name: "connect_neo4j",
            description: "Connect to a Neo4j database (or reconnect). Supports optional forced reconnection if already connected.",
            schema: {
                "type": "object",
                "properties": {
                    "uri": {
                        "type": "string",
                        "description": "Neo4j connection URI (e.g. neo4j://localhost:7687)"
                    },
                    "username": {
                        "type": "string",
                        "description": "Neo4j username"
                    },
                    "password": {
                        "type": "string",
                        "description": "Neo4j password"
                    },
                    "force": {
                        "type": "boolean",
                        "description": "Replace an existing connection (default: false)",
                        "default": false
                    }
                },
                "required": ["uri", "username", "password"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "connect_neo4j"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: ConnectArgs = parse_args(arguments)?;
        let config = ConnectionConfig::builder()
            .uri(args.uri)
            .username(args.username)
            .password(args.password)
            .source(CredentialSource::Manual)
            .build()?;

        let outcome = self.connections.manual_connect(config, args.force).await?;
        info!(force = args.force, "{}", outcome.message());
        Ok(CallToolResult::text(outcome.message()))
    }
}

/// Closes the current connection, if any.
pub struct DisconnectTool {
    connections: ConnectionManager,
}

impl DisconnectTool {
    pub fn new(connections: ConnectionManager) -> Self {
        Self { connections }
    }
}

#[async_trait]
impl ToolHandler for DisconnectTool {
    fn definition(&self) -> Tool {
        crate::define_tool! {
            name: "disconnect_neo4j",
            description: "Disconnect from the Neo4j database",
            schema: {
                "type": "object",
                "properties": {}
            }
        }
    }

    #[instrument(skip(self, _arguments), fields(tool = "disconnect_neo4j"))]
    async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
        let outcome = self.connections.disconnect().await;
        Ok(CallToolResult::text(outcome.message()))
    }
}
