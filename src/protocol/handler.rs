//! Routes JSON-RPC requests to a [`Handler`].

use crate::error::{ProtocolError, ProtocolResult};
use crate::protocol::types::*;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Server-side behaviour behind the MCP methods.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn initialize(&self, params: InitializeParams) -> ProtocolResult<InitializeResult>;

    async fn list_tools(&self) -> ProtocolResult<ListToolsResult>;

    /// Tool failures are reported inside the result; an `Err` here is a
    /// protocol-level failure.
    async fn call_tool(&self, params: CallToolParams) -> ProtocolResult<CallToolResult>;

    /// Runs before the reply to an MCP `shutdown` request is written.
    async fn shutdown(&self) {}
}

pub struct Dispatcher<H: Handler> {
    handler: Arc<H>,
}

impl<H: Handler> Dispatcher<H> {
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Returns the reply to send, or `None` for a notification.
    #[instrument(skip(self, request), fields(method = %request.method))]
    pub async fn dispatch(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let JsonRpcRequest {
            jsonrpc,
            id,
            method,
            params,
        } = request;

        let Some(id) = id else {
            debug!("Notification {} acknowledged", method);
            return None;
        };

        let outcome = if jsonrpc == JSONRPC_VERSION {
            self.route(&method, params).await
        } else {
            Err(ProtocolError::InvalidRequest(
                format!("unsupported jsonrpc version '{}'", jsonrpc).into(),
            ))
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                warn!(code = e.code(), "{} failed: {}", method, e);
                JsonRpcResponse::failure(Some(id), &e)
            }
        })
    }

    async fn route(&self, method: &str, params: Option<Value>) -> ProtocolResult<Value> {
        match method {
            "initialize" => {
                let params = params.unwrap_or_else(|| json!({}));
                to_result(self.handler.initialize(decode(params)?).await?)
            }
            "ping" => Ok(json!({})),
            "tools/list" => to_result(self.handler.list_tools().await?),
            "tools/call" => {
                let params =
                    params.ok_or_else(|| ProtocolError::InvalidParams("missing params".into()))?;
                to_result(self.handler.call_tool(decode(params)?).await?)
            }
            "shutdown" => {
                self.handler.shutdown().await;
                Ok(Value::Null)
            }
            other => Err(ProtocolError::MethodNotFound(other.to_string())),
        }
    }
}

fn decode<T: DeserializeOwned>(params: Value) -> ProtocolResult<T> {
    serde_json::from_value(params).map_err(|e| ProtocolError::InvalidParams(e.to_string().into()))
}

fn to_result<T: Serialize>(result: T) -> ProtocolResult<Value> {
    serde_json::to_value(result).map_err(|e| ProtocolError::InternalError(e.to_string().into()))
}
