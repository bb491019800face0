//! One-shot connection attempt at process start.

use crate::config::Resolution;
use crate::database::{ConnectOutcome, ConnectionManager};
use tracing::{info, warn};

/// Connects once when a single credential source supplied every field.
///
/// Failure is logged and leaves the manager disconnected; the server keeps
/// running and waits for `connect_neo4j`.
pub async fn eager_connect(
    connections: &ConnectionManager,
    resolution: Resolution,
) -> Option<ConnectOutcome> {
    let Some(config) = resolution.config.filter(|_| resolution.eager_connect) else {
        info!("No database connection. Use the 'connect_neo4j' tool to establish a connection.");
        return None;
    };

    info!(
        source = %config.source,
        "Connecting to Neo4j at {}",
        config.sanitized_uri()
    );

    match connections.connect(config).await {
        Ok(outcome) => {
            info!("{}", outcome.message());
            Some(outcome)
        }
        Err(e) => {
            warn!(kind = %e.kind(), "Initial Neo4j connection attempt failed: {}", e);
            warn!("Server will start without a connection. Use 'connect_neo4j' to retry.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CredentialResolver, CredentialSource, PartialCredentials};
    use crate::database::mock::MockConnector;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    fn complete() -> PartialCredentials {
        PartialCredentials::new(
            Some("neo4j://db:7687".into()),
            Some("neo4j".into()),
            Some("secret".into()),
        )
    }

    fn manager() -> (ConnectionManager, Arc<MockConnector>) {
        let connector = Arc::new(MockConnector::new());
        (ConnectionManager::new(connector.clone()), connector)
    }

    #[tokio::test]
    async fn test_connects_once_from_complete_source() {
        let (manager, connector) = manager();
        let resolution = CredentialResolver::new()
            .source(CredentialSource::CommandLine, PartialCredentials::default())
            .source(CredentialSource::Environment, complete())
            .resolve();

        let outcome = eager_connect(&manager, resolution).await;

        assert!(matches!(outcome, Some(ConnectOutcome::Connected(_))));
        assert_eq!(connector.stats().drivers_opened.load(Ordering::SeqCst), 1);
        assert_eq!(manager.metadata().source, Some(CredentialSource::Environment));
    }

    #[tokio::test]
    async fn test_unreachable_database_leaves_server_disconnected() {
        let (manager, connector) = manager();
        connector.set_unreachable(true);
        let resolution = CredentialResolver::new()
            .source(CredentialSource::CommandLine, complete())
            .resolve();

        let outcome = eager_connect(&manager, resolution).await;

        assert!(outcome.is_none());
        assert_eq!(connector.stats().drivers_opened.load(Ordering::SeqCst), 1);
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn test_incomplete_sources_open_no_driver() {
        let (manager, connector) = manager();
        let resolution = CredentialResolver::new()
            .source(
                CredentialSource::CommandLine,
                PartialCredentials::new(Some("neo4j://db:7687".into()), None, None),
            )
            .source(
                CredentialSource::Environment,
                PartialCredentials::new(None, Some("neo4j".into()), Some("secret".into())),
            )
            .resolve();

        assert!(eager_connect(&manager, resolution).await.is_none());
        assert_eq!(connector.stats().drivers_opened.load(Ordering::SeqCst), 0);
        assert!(!manager.is_connected());
    }
}
