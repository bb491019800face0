//! Error types for the MCP server.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` conversions.
//! Every database-facing failure is normalized into [`DatabaseError`] before it
//! reaches the tool layer, and each variant reports one [`ErrorKind`].

use serde::Serialize;
use std::borrow::Cow;
use thiserror::Error;

/// Main error type for the MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: Cow<'static, str> },
}

impl McpError {
    /// Caller-facing classification, for database and configuration failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Database(e) => Some(e.kind()),
            Self::Config(_) => Some(ErrorKind::Config),
            _ => None,
        }
    }
}

/// JSON-RPC 2.0 and MCP protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Parse error: invalid JSON")]
    ParseError,

    #[error("Invalid request: {0}")]
    InvalidRequest(Cow<'static, str>),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(Cow<'static, str>),

    #[error("Internal error: {0}")]
    InternalError(Cow<'static, str>),
}

impl ProtocolError {
    /// Returns the JSON-RPC 2.0 error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::InternalError(_) => -32603,
        }
    }
}

/// Failure classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Credentials incomplete or invalid at a point requiring them.
    Config,
    /// Unreachable host, rejected authentication, or no usable connection.
    Connection,
    /// The operation (or the wait for a permit) exceeded its bound.
    Timeout,
    /// Malformed statement or a database-reported failure.
    QueryFailed,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Config => "config",
            Self::Connection => "connection",
            Self::Timeout => "timeout",
            Self::QueryFailed => "query_failed",
        };
        f.write_str(name)
    }
}

/// Database-related errors.
///
/// Messages never contain raw credentials: driver text is passed through
/// [`crate::database::uri::redact`] before it is wrapped here.
#[derive(Debug, Clone, Error)]
pub enum DatabaseError {
    #[error(
        "Not connected to Neo4j. Use the 'connect_neo4j' tool to establish a connection."
    )]
    NotConnected,

    #[error("Connection was closed while the operation was in flight")]
    ConnectionClosed,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Timed out after {0}ms connecting to Neo4j")]
    ConnectTimeout(u64),

    #[error("Query timed out after {0}ms")]
    Timeout(u64),

    #[error("Timed out after {0}ms waiting for a free execution slot")]
    PermitTimeout(u64),

    #[error("Invalid query: {0}")]
    InvalidQuery(Cow<'static, str>),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),
}

impl DatabaseError {
    /// Classifies this error into one of the caller-facing kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotConnected
            | Self::ConnectionClosed
            | Self::ConnectionFailed(_)
            | Self::ConnectTimeout(_) => ErrorKind::Connection,
            Self::Timeout(_) | Self::PermitTimeout(_) => ErrorKind::Timeout,
            Self::InvalidQuery(_) | Self::QueryFailed(_) => ErrorKind::QueryFailed,
        }
    }

    /// Underlying (already redacted) cause, when the failure came from the driver.
    pub fn cause(&self) -> Option<&str> {
        match self {
            Self::ConnectionFailed(cause) | Self::QueryFailed(cause) => Some(cause),
            _ => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(Cow<'static, str>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Failed to load env file {path}: {message}")]
    EnvFile { path: String, message: String },
}

/// Tool execution errors.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Missing required argument(s) for {tool}: {missing}")]
    MissingArguments { tool: String, missing: String },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Result type alias for McpError.
pub type Result<T> = std::result::Result<T, McpError>;

/// Result type alias for DatabaseError.
pub type DbResult<T> = std::result::Result<T, DatabaseError>;

/// Result type alias for ProtocolError.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_codes() {
        assert_eq!(ProtocolError::ParseError.code(), -32700);
        assert_eq!(ProtocolError::InvalidRequest("test".into()).code(), -32600);
        assert_eq!(ProtocolError::MethodNotFound("test".into()).code(), -32601);
        assert_eq!(ProtocolError::InvalidParams("test".into()).code(), -32602);
        assert_eq!(ProtocolError::InternalError("test".into()).code(), -32603);
    }

    #[test]
    fn test_error_conversion() {
        let db_error = DatabaseError::ConnectionFailed("test".into());
        let mcp_error: McpError = db_error.into();
        assert!(matches!(mcp_error, McpError::Database(_)));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(DatabaseError::NotConnected.kind(), ErrorKind::Connection);
        assert_eq!(DatabaseError::ConnectionClosed.kind(), ErrorKind::Connection);
        assert_eq!(DatabaseError::Timeout(10).kind(), ErrorKind::Timeout);
        assert_eq!(DatabaseError::PermitTimeout(10).kind(), ErrorKind::Timeout);
        assert_eq!(
            DatabaseError::InvalidQuery("empty".into()).kind(),
            ErrorKind::QueryFailed
        );
        assert_eq!(DatabaseError::ConnectTimeout(10).kind(), ErrorKind::Connection);
    }

    #[test]
    fn test_mcp_error_kind() {
        let err: McpError = ConfigError::MissingField("uri".into()).into();
        assert_eq!(err.kind(), Some(ErrorKind::Config));

        let err: McpError = DatabaseError::Timeout(5).into();
        assert_eq!(err.kind(), Some(ErrorKind::Timeout));

        let err: McpError = ToolError::NotFound("nope".into()).into();
        assert_eq!(err.kind(), None);
    }

    #[test]
    fn test_cause_only_for_driver_failures() {
        let err = DatabaseError::QueryFailed("syntax error".into());
        assert_eq!(err.cause(), Some("syntax error"));
        assert_eq!(DatabaseError::Timeout(5).cause(), None);
    }

    #[test]
    fn test_missing_arguments_message() {
        let err = ToolError::MissingArguments {
            tool: "find_nodes".into(),
            missing: "name".into(),
        };
        assert_eq!(
            err.to_string(),
            "Missing required argument(s) for find_nodes: name"
        );
    }
}
