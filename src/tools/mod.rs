//! MCP tool definitions and registry.

pub mod connection;
pub mod entity;
pub mod observation;
pub mod query;
pub mod registry;
pub mod relationship;
pub mod search;
pub mod status;

pub use connection::{ConnectTool, DisconnectTool};
pub use entity::{CreateEntitiesTool, DeleteEntitiesTool};
pub use observation::{AddObservationsTool, DeleteObservationsTool};
pub use query::RunCypherQueryTool;
pub use registry::{ToolHandler, ToolRegistry, error_message};
pub use relationship::{CreateRelationsTool, DeleteRelationsTool};
pub use search::{FindNodesTool, SearchNodesTool};
pub use status::{HealthCheckTool, ShutdownServerTool};

use crate::database::QueryExecutor;
use crate::server::HealthReporter;
use tokio_util::sync::CancellationToken;

/// Condition matching `var` by `name`, `id` or element id against `$param`.
pub(crate) fn entity_match(var: &str, param: &str) -> String {
    format!(
        "({v}.name = ${p} OR {v}.id = ${p} OR elementId({v}) = ${p})",
        v = var,
        p = param
    )
}

/// Create and register all tools.
pub fn create_registry(
    executor: QueryExecutor,
    health: HealthReporter,
    shutdown: CancellationToken,
) -> ToolRegistry {
    let registry = ToolRegistry::new();

    // Connection management (always available)
    registry.register(ConnectTool::new(executor.connections().clone()));
    registry.register(DisconnectTool::new(executor.connections().clone()));

    // Statements (require connection)
    registry.register(RunCypherQueryTool::new(executor.clone()));
    registry.register(FindNodesTool::new(executor.clone()));
    registry.register(SearchNodesTool::new(executor.clone()));
    registry.register(CreateEntitiesTool::new(executor.clone()));
    registry.register(DeleteEntitiesTool::new(executor.clone()));
    registry.register(CreateRelationsTool::new(executor.clone()));
    registry.register(DeleteRelationsTool::new(executor.clone()));
    registry.register(AddObservationsTool::new(executor.clone()));
    registry.register(DeleteObservationsTool::new(executor));

    // Server status
    registry.register(HealthCheckTool::new(health));
    registry.register(ShutdownServerTool::new(shutdown));

    registry
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::config::{ConnectionConfig, CredentialSource, ExecutorConfig};
    use crate::database::mock::MockConnector;
    use crate::database::{ConnectionManager, QueryExecutor};
    use std::sync::Arc;

    /// Executor connected to `neo4j://localhost:7687` through a mock driver.
    pub async fn connected_executor() -> (QueryExecutor, Arc<MockConnector>) {
        let connector = Arc::new(MockConnector::new());
        let manager = ConnectionManager::new(connector.clone());
        manager
            .connect(ConnectionConfig::new(
                "neo4j://localhost:7687",
                "neo4j",
                "secret",
                CredentialSource::Manual,
            ))
            .await
            .unwrap();
        (
            QueryExecutor::new(manager, ExecutorConfig::default()),
            connector,
        )
    }
}
