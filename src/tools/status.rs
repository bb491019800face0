//! Server status and lifecycle tools.

use crate::error::Result;
use crate::protocol::{CallToolResult, Tool};
use crate::server::HealthReporter;
use crate::tools::registry::ToolHandler;
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

pub struct HealthCheckTool {
    reporter: HealthReporter,
}

impl HealthCheckTool {
    pub fn new(reporter: HealthReporter) -> Self {
        Self { reporter }
    }
}

#[async_trait]
impl ToolHandler for HealthCheckTool {
    fn definition(&self) -> Tool {
        crate::define_tool! {
            name: "health_check",
            description: "Return server health status including connection state, server version, sanitized Neo4j URI and uptime.",
            schema: {
                "type": "object",
                "properties": {}
            }
        }
    }

    #[instrument(skip(self, _arguments), fields(tool = "health_check"))]
    async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
        Ok(CallToolResult::text(self.reporter.snapshot().to_text()))
    }
}

/// Cancels the process-wide shutdown token. Connection teardown happens in
/// the main task once the server loop has drained.
pub struct ShutdownServerTool {
    shutdown: CancellationToken,
}

impl ShutdownServerTool {
    pub fn new(shutdown: CancellationToken) -> Self {
        Self { shutdown }
    }
}

#[async_trait]
impl ToolHandler for ShutdownServerTool {
    fn definition(&self) -> Tool {
        crate::define_tool! {
            name: "shutdown_server",
            description: "Request graceful shutdown of the server (closes connection and stops event loop).",
            schema: {
                "type": "object",
                "properties": {}
            }
        }
    }

    #[instrument(skip(self, _arguments), fields(tool = "shutdown_server"))]
    async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
        if self.shutdown.is_cancelled() {
            return Ok(CallToolResult::text("Shutdown already in progress."));
        }

        info!("Shutdown requested through shutdown_server");
        self.shutdown.cancel();
        Ok(CallToolResult::text(
            "Shutdown signal accepted. Server will terminate shortly.",
        ))
    }
}
