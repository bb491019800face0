//! Configuration types and builders.

pub mod credentials;

pub use credentials::{CredentialResolver, PartialCredentials, Resolution};

use crate::database::uri::sanitize_uri;
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

/// Where a set of connection settings came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// `--neo4j-uri` / `--neo4j-username` / `--neo4j-password`.
    CommandLine,
    /// `NEO4J_*` variables, including values loaded from a `.env` file.
    Environment,
    /// Supplied through the `connect_neo4j` tool.
    Manual,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CommandLine => "command_line",
            Self::Environment => "environment",
            Self::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// Neo4j connection settings.
///
/// `Debug` prints the sanitized URI and hides the password.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub uri: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub source: CredentialSource,
}

impl ConnectionConfig {
    pub fn new(
        uri: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        source: CredentialSource,
    ) -> Self {
        Self {
            uri: uri.into(),
            username: username.into(),
            password: password.into(),
            source,
        }
    }

    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    /// URI with any embedded `user:pass@` segment removed.
    pub fn sanitized_uri(&self) -> String {
        sanitize_uri(&self.uri)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("uri", &self.sanitized_uri())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Builder for ConnectionConfig with fluent API.
#[derive(Default)]
pub struct ConnectionConfigBuilder {
    uri: Option<String>,
    username: Option<String>,
    password: Option<String>,
    source: Option<CredentialSource>,
}

impl ConnectionConfigBuilder {
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn source(mut self, source: CredentialSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn build(self) -> Result<ConnectionConfig> {
        let uri = require(self.uri, "uri")?;
        let username = require(self.username, "username")?;
        let password = require(self.password, "password")?;

        if !uri.contains("://") {
            return Err(ConfigError::InvalidValue {
                field: "uri".into(),
                message: "expected a scheme such as neo4j:// or bolt://".into(),
            }
            .into());
        }

        Ok(ConnectionConfig {
            uri,
            username,
            password,
            source: self.source.unwrap_or(CredentialSource::Manual),
        })
    }
}

fn require(value: Option<String>, field: &'static str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingField(field.into()).into()),
    }
}

/// Limits applied to database work: connecting and running statements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum number of in-flight database operations.
    pub max_concurrency: usize,
    /// Default per-statement timeout.
    pub query_timeout: Duration,
    /// Optional bound on waiting for a permit; `None` waits indefinitely.
    pub acquire_timeout: Option<Duration>,
    /// Hard cap on records collected per statement.
    pub max_records: usize,
    /// Maximum accepted statement length in bytes.
    pub max_query_length: usize,
    /// Bound on opening a driver and verifying connectivity.
    pub connect_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            query_timeout: Duration::from_secs(10),
            acquire_timeout: None,
            max_records: 1000,
            max_query_length: 10_000,
            connect_timeout: Duration::from_secs(15),
        }
    }
}

impl ExecutorConfig {
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::default()
    }
}

/// Builder for ExecutorConfig.
#[derive(Default)]
pub struct ExecutorConfigBuilder {
    config: ExecutorConfig,
}

impl ExecutorConfigBuilder {
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.config.max_concurrency = max;
        self
    }

    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.config.query_timeout = timeout;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.acquire_timeout = timeout;
        self
    }

    pub fn max_records(mut self, max: usize) -> Self {
        self.config.max_records = max;
        self
    }

    pub fn max_query_length(mut self, length: usize) -> Self {
        self.config.max_query_length = length;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ExecutorConfig> {
        if self.config.max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrency".into(),
                message: "must be greater than 0".into(),
            }
            .into());
        }
        if self.config.query_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "query_timeout".into(),
                message: "must be greater than 0".into(),
            }
            .into());
        }
        if self.config.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "connect_timeout".into(),
                message: "must be greater than 0".into(),
            }
            .into());
        }
        if self.config.max_records == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_records".into(),
                message: "must be greater than 0".into(),
            }
            .into());
        }
        Ok(self.config)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: Cow<'static, str>,
    pub version: Cow<'static, str>,
    pub executor: ExecutorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "neo4j-mcp".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig.
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn executor(mut self, executor: ExecutorConfig) -> Self {
        self.config.executor = executor;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}
