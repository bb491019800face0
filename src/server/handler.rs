//! MCP request handler implementation.

use crate::error::ProtocolResult;
use crate::protocol::{
    CallToolParams, CallToolResult, Handler, Implementation, InitializeParams, InitializeResult,
    ListToolsResult, negotiate_protocol_version,
};
use crate::server::state::ServerState;
use crate::tools::error_message;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// MCP request handler that processes protocol messages.
pub struct McpHandler {
    state: Arc<ServerState>,
}

impl McpHandler {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    fn instructions(&self) -> String {
        let metadata = self.state.connections().metadata();
        match metadata.uri.as_deref().filter(|_| metadata.connected) {
            Some(uri) => format!(
                "Neo4j MCP Server connected to {}. \
                Use run_cypher_query for arbitrary Cypher, find_nodes and search_nodes to look up \
                nodes, and the entity, relation and observation tools to maintain a memory graph.",
                uri
            ),
            None => "Neo4j MCP Server (not connected). \
                Use the 'connect_neo4j' tool to establish a connection. \
                health_check reports connection state at any time."
                .to_string(),
        }
    }
}

#[async_trait]
impl Handler for McpHandler {
    async fn initialize(&self, params: InitializeParams) -> ProtocolResult<InitializeResult> {
        let version = negotiate_protocol_version(params.protocol_version.as_deref());
        info!(
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            "Session opened with protocol {}",
            version
        );

        Ok(InitializeResult::tools_only(
            version,
            Implementation {
                name: self.state.config.name.to_string(),
                version: self.state.config.version.to_string(),
            },
            self.instructions(),
        ))
    }

    async fn list_tools(&self) -> ProtocolResult<ListToolsResult> {
        let tools = self.state.tools.list();
        debug!("Listing {} tools", tools.len());
        Ok(ListToolsResult { tools })
    }

    async fn call_tool(&self, params: CallToolParams) -> ProtocolResult<CallToolResult> {
        let tool = params.name.clone();
        debug!("Tool call: {}", tool);

        match self.state.tools.execute(params).await {
            Ok(result) => Ok(result),
            Err(e) => {
                let kind = e.kind().map(|k| k.to_string());
                warn!(tool = %tool, kind = ?kind, "Tool execution error: {}", e);
                Ok(CallToolResult::error(error_message(&e)))
            }
        }
    }

    async fn shutdown(&self) {
        info!("Shutdown request received");
    }
}
