//! Server state management.

use crate::config::ServerConfig;
use crate::database::{ConnectionManager, QueryExecutor};
use crate::error::{ConfigError, Result};
use crate::server::health::HealthReporter;
use crate::tools::ToolRegistry;
use tokio_util::sync::CancellationToken;

/// Everything a request needs, shared by all in-flight requests.
pub struct ServerState {
    pub config: ServerConfig,
    pub executor: QueryExecutor,
    pub health: HealthReporter,
    pub tools: ToolRegistry,
    shutdown: CancellationToken,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        executor: QueryExecutor,
        health: HealthReporter,
        tools: ToolRegistry,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            executor,
            health,
            tools,
            shutdown,
        }
    }

    pub fn connections(&self) -> &ConnectionManager {
        self.executor.connections()
    }

    pub fn is_connected(&self) -> bool {
        self.connections().is_connected()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

pub struct ServerStateBuilder {
    config: Option<ServerConfig>,
    connection_manager: Option<ConnectionManager>,
    shutdown: Option<CancellationToken>,
}

impl ServerStateBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            connection_manager: None,
            shutdown: None,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn connection_manager(mut self, connection_manager: ConnectionManager) -> Self {
        self.connection_manager = Some(connection_manager);
        self
    }

    /// Token cancelled by the `shutdown_server` tool.
    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    pub fn build(self) -> Result<ServerState> {
        let config = self
            .config
            .ok_or(ConfigError::MissingField("config".into()))?;
        let connection_manager = self
            .connection_manager
            .ok_or(ConfigError::MissingField("connection_manager".into()))?;
        let shutdown = self.shutdown.unwrap_or_default();

        let executor = QueryExecutor::new(connection_manager, config.executor.clone());
        let health = HealthReporter::new(
            executor.clone(),
            config.name.clone(),
            config.version.clone(),
        );
        let tools =
            crate::tools::create_registry(executor.clone(), health.clone(), shutdown.clone());

        Ok(ServerState::new(config, executor, health, tools, shutdown))
    }
}

impl Default for ServerStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
