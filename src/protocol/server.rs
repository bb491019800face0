//! MCP server loop with lifecycle management.
//!
//! Each request is dispatched on its own task so a slow query never blocks
//! the reader; responses are written through the transport's serialized
//! writer. The loop stops on end of input, an MCP `shutdown` request, or
//! cancellation of the shutdown token.

use crate::error::{McpError, ProtocolError, Result};
use crate::protocol::handler::{Dispatcher, Handler};
use crate::protocol::transport::{StdioTransport, Transport};
use crate::protocol::types::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, warn};

/// How long in-flight requests may keep running once the loop stops.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Server state enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Server created but not initialized.
    Created,
    /// Initialize request received, awaiting initialized notification.
    Initializing,
    /// Server is fully operational.
    Running,
    /// Shutdown requested.
    ShuttingDown,
    /// Server has stopped.
    Stopped,
}

/// MCP Server.
pub struct McpServer<H: Handler> {
    info: Implementation,
    handler: Arc<H>,
    state: Arc<RwLock<ServerState>>,
    shutdown: CancellationToken,
}

impl<H: Handler + 'static> McpServer<H> {
    pub fn new(handler: H, info: Implementation, shutdown: CancellationToken) -> Self {
        Self {
            info,
            handler: Arc::new(handler),
            state: Arc::new(RwLock::new(ServerState::Created)),
            shutdown,
        }
    }

    pub async fn state(&self) -> ServerState {
        *self.state.read().await
    }

    /// Token that stops the loop when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the server with stdio transport.
    #[instrument(skip(self), fields(server = %self.info.name))]
    pub async fn run(self) -> Result<()> {
        let transport = Arc::new(StdioTransport::stdio());
        self.run_with_transport(transport).await
    }

    /// Run the server with a custom transport.
    pub async fn run_with_transport<T: Transport + 'static>(
        &self,
        transport: Arc<T>,
    ) -> Result<()> {
        info!(
            "Starting MCP server: {} v{}",
            self.info.name, self.info.version
        );

        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&self.handler)));
        let in_flight = TaskTracker::new();

        loop {
            let read = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested, stopping server loop");
                    break;
                }
                read = transport.read_message() => read,
            };

            let message = match read {
                Ok(Some(msg)) => msg,
                Ok(None) => {
                    debug!("EOF received, shutting down");
                    break;
                }
                Err(McpError::Protocol(ProtocolError::ParseError)) => {
                    let response = JsonRpcResponse::failure(None, &ProtocolError::ParseError);
                    if let Err(e) = transport.write_response(&response).await {
                        error!("Failed to send error response: {}", e);
                    }
                    continue;
                }
                Err(e) => {
                    error!("Transport error: {}", e);
                    break;
                }
            };

            match message {
                Message::Request(request) => {
                    self.update_state_for_method(&request.method).await;

                    if request.method == "shutdown" {
                        // Answered inline so the reply precedes the stop.
                        if let Some(response) = dispatcher.dispatch(request).await {
                            reply(transport.as_ref(), &response).await;
                        }
                        self.shutdown.cancel();
                        continue;
                    }

                    let dispatcher = Arc::clone(&dispatcher);
                    let transport = Arc::clone(&transport);
                    in_flight.spawn(async move {
                        if let Some(response) = dispatcher.dispatch(request).await {
                            reply(transport.as_ref(), &response).await;
                        }
                    });
                }
                Message::Response(response) => {
                    warn!("Unexpected response received: {:?}", response.id);
                }
            }
        }

        *self.state.write().await = ServerState::ShuttingDown;
        in_flight.close();
        if !in_flight.is_empty() {
            info!("Waiting for {} in-flight requests", in_flight.len());
            if tokio::time::timeout(DRAIN_TIMEOUT, in_flight.wait()).await.is_err() {
                warn!("Abandoning {} requests still running", in_flight.len());
            }
        }

        *self.state.write().await = ServerState::Stopped;
        info!("Server stopped");
        Ok(())
    }

    /// Update server state based on the method being processed.
    async fn update_state_for_method(&self, method: &str) {
        let mut state = self.state.write().await;
        match method {
            "initialize" => {
                if *state == ServerState::Created {
                    *state = ServerState::Initializing;
                }
            }
            "notifications/initialized" | "initialized" => {
                if *state == ServerState::Initializing {
                    *state = ServerState::Running;
                    info!("Server initialized and running");
                }
            }
            "shutdown" => {
                *state = ServerState::ShuttingDown;
            }
            _ => {}
        }
    }
}

async fn reply<T: Transport>(transport: &T, response: &JsonRpcResponse) {
    if let Err(e) = transport.write_response(response).await {
        error!("Failed to send response: {}", e);
    }
}

/// Builder for MCP Server.
pub struct McpServerBuilder<H: Handler> {
    handler: Option<H>,
    name: String,
    version: String,
    shutdown: Option<CancellationToken>,
}

impl<H: Handler + 'static> McpServerBuilder<H> {
    pub fn new() -> Self {
        Self {
            handler: None,
            name: env!("CARGO_PKG_NAME").into(),
            version: env!("CARGO_PKG_VERSION").into(),
            shutdown: None,
        }
    }

    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Shares a shutdown token with the rest of the process.
    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    pub fn build(self) -> Result<McpServer<H>> {
        let handler = self.handler.ok_or_else(|| McpError::Internal {
            message: "Handler is required".into(),
        })?;

        Ok(McpServer::new(
            handler,
            Implementation {
                name: self.name,
                version: self.version,
            },
            self.shutdown.unwrap_or_default(),
        ))
    }
}

impl<H: Handler + 'static> Default for McpServerBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolResult;
    use crate::protocol::transport::LineTransport;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    struct TestHandler;

    #[async_trait]
    impl Handler for TestHandler {
        async fn initialize(&self, _params: InitializeParams) -> ProtocolResult<InitializeResult> {
            Ok(InitializeResult::tools_only(
                SUPPORTED_PROTOCOL_VERSIONS[0],
                Implementation::default(),
                String::new(),
            ))
        }

        async fn list_tools(&self) -> ProtocolResult<ListToolsResult> {
            Ok(ListToolsResult { tools: vec![] })
        }

        async fn call_tool(&self, params: CallToolParams) -> ProtocolResult<CallToolResult> {
            if params.name == "slow" {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            Ok(CallToolResult::text(params.name))
        }
    }

    fn call(id: i64, tool: &str) -> String {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {"name": tool, "arguments": {}}
        })
        .to_string()
    }

    #[test]
    fn test_server_builder() {
        let server = McpServerBuilder::new()
            .handler(TestHandler)
            .name("test-server")
            .version("0.1.0")
            .build()
            .unwrap();

        assert_eq!(server.info.name, "test-server");
        assert_eq!(server.info.version, "0.1.0");
    }

    #[tokio::test]
    async fn test_server_state() {
        let server = McpServerBuilder::new()
            .handler(TestHandler)
            .build()
            .unwrap();

        assert_eq!(server.state().await, ServerState::Created);
    }

    #[tokio::test]
    async fn test_slow_request_does_not_block_others() {
        let (mut client, server_io) = tokio::io::duplex(4096);
        let (reader, writer) = tokio::io::split(server_io);
        let transport = Arc::new(LineTransport::new(reader, writer));

        let server = McpServerBuilder::new()
            .handler(TestHandler)
            .build()
            .unwrap();
        let token = server.shutdown_token();
        let running = tokio::spawn(async move { server.run_with_transport(transport).await });

        let input = format!("{}\n{}\n", call(1, "slow"), call(2, "fast"));
        client.write_all(input.as_bytes()).await.unwrap();

        let mut lines = BufReader::new(client).lines();
        let first: JsonRpcResponse =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        let second: JsonRpcResponse =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();

        assert_eq!(first.id, Some(RequestId::Number(2)));
        assert_eq!(second.id, Some(RequestId::Number(1)));

        token.cancel();
        running.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_request_stops_loop() {
        let (mut client, server_io) = tokio::io::duplex(4096);
        let (reader, writer) = tokio::io::split(server_io);
        let transport = Arc::new(LineTransport::new(reader, writer));

        let server = McpServerBuilder::new()
            .handler(TestHandler)
            .build()
            .unwrap();
        let token = server.shutdown_token();

        let request = json!({"jsonrpc": "2.0", "id": 9, "method": "shutdown"}).to_string();
        client
            .write_all(format!("{}\n", request).as_bytes())
            .await
            .unwrap();

        server.run_with_transport(transport).await.unwrap();
        assert!(token.is_cancelled());
        assert_eq!(server.state().await, ServerState::Stopped);

        let mut lines = BufReader::new(client).lines();
        let response: JsonRpcResponse =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(response.id, Some(RequestId::Number(9)));
    }

    #[tokio::test]
    async fn test_notifications_are_not_answered() {
        let input = format!(
            "{}\n{}\n",
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"})
        );
        let (client, server_io) = tokio::io::duplex(4096);
        let input = std::io::Cursor::new(input.into_bytes());
        let transport = Arc::new(LineTransport::new(input, server_io));

        let server = McpServerBuilder::new()
            .handler(TestHandler)
            .build()
            .unwrap();
        server.run_with_transport(transport).await.unwrap();

        // Only the initialize request is answered.
        let mut lines = BufReader::new(client).lines();
        let response: JsonRpcResponse =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(response.id, Some(RequestId::Number(1)));
        assert!(lines.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_eof_stops_loop() {
        let transport = Arc::new(LineTransport::new(tokio::io::empty(), tokio::io::sink()));
        let server = McpServerBuilder::new()
            .handler(TestHandler)
            .build()
            .unwrap();

        server.run_with_transport(transport).await.unwrap();
        assert_eq!(server.state().await, ServerState::Stopped);
    }
}
