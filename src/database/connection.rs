//! Single shared Neo4j connection with serialized lifecycle changes.
//!
//! Readers clone the current `Arc<ConnectionHandle>` under a short
//! `parking_lot::RwLock`; connect, disconnect and force-reconnect run one at a
//! time under an async mutex held only across the mutation.

use crate::config::{ConnectionConfig, CredentialSource};
use crate::database::traits::{Connector, GraphDriver};
use crate::error::{DatabaseError, DbResult};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, info, warn};

/// Bound on opening and verifying a connection when none is configured.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// A live, verified driver and the settings it was opened with.
pub struct ConnectionHandle {
    id: u64,
    driver: Arc<dyn GraphDriver>,
    config: ConnectionConfig,
    connected_at: DateTime<Utc>,
    connected_instant: Instant,
    token: CancellationToken,
}

impl ConnectionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn driver(&self) -> &Arc<dyn GraphDriver> {
        &self.driver
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Monotonic time since the handle was established.
    pub fn uptime(&self) -> Duration {
        self.connected_instant.elapsed()
    }

    /// True once the handle has been torn down.
    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when the handle is torn down.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub fn metadata(&self) -> ConnectionMetadata {
        ConnectionMetadata {
            connected: true,
            uri: Some(self.config.sanitized_uri()),
            username: Some(self.config.username.clone()),
            source: Some(self.config.source),
            connected_at: Some(self.connected_at),
            handle_id: Some(self.id),
        }
    }
}

/// Credential-free view of the connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionMetadata {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<CredentialSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle_id: Option<u64>,
}

impl ConnectionMetadata {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            uri: None,
            username: None,
            source: None,
            connected_at: None,
            handle_id: None,
        }
    }
}

/// Result of a connect request.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectOutcome {
    /// A new handle was established from the disconnected state.
    Connected(ConnectionMetadata),
    /// The previous handle was replaced.
    Reconnected(ConnectionMetadata),
    /// A handle already existed and was left untouched.
    AlreadyConnected(ConnectionMetadata),
}

impl ConnectOutcome {
    pub fn metadata(&self) -> &ConnectionMetadata {
        match self {
            Self::Connected(m) | Self::Reconnected(m) | Self::AlreadyConnected(m) => m,
        }
    }

    pub fn message(&self) -> String {
        let meta = self.metadata();
        let uri = meta.uri.as_deref().unwrap_or("unknown");
        match self {
            Self::Connected(_) => format!("Successfully connected to Neo4j at {}", uri),
            Self::Reconnected(_) => format!("Reconnected to Neo4j at {}", uri),
            Self::AlreadyConnected(_) => format!(
                "Already connected to Neo4j at {}; skipping reconnect (use force=true to reconnect).",
                uri
            ),
        }
    }
}

/// Result of a disconnect request.
#[derive(Debug, Clone, PartialEq)]
pub enum DisconnectOutcome {
    /// The handle described by the metadata was closed.
    Disconnected(ConnectionMetadata),
    /// There was nothing to close.
    NotConnected,
}

impl DisconnectOutcome {
    pub fn message(&self) -> String {
        match self {
            Self::Disconnected(meta) => format!(
                "Disconnected from Neo4j at {}",
                meta.uri.as_deref().unwrap_or("unknown")
            ),
            Self::NotConnected => "No active Neo4j connection to close.".to_string(),
        }
    }
}

/// Owns the single live connection handle.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    state: Arc<RwLock<Option<Arc<ConnectionHandle>>>>,
    mutation: Arc<Mutex<()>>,
    next_id: Arc<AtomicU64>,
    connect_timeout: Duration,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            state: Arc::new(RwLock::new(None)),
            mutation: Arc::new(Mutex::new(())),
            next_id: Arc::new(AtomicU64::new(1)),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Gives up on a connect attempt after `timeout`, releasing the lifecycle
    /// lock with the manager left disconnected.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn is_connected(&self) -> bool {
        self.state.read().is_some()
    }

    pub fn metadata(&self) -> ConnectionMetadata {
        match &*self.state.read() {
            Some(handle) => handle.metadata(),
            None => ConnectionMetadata::disconnected(),
        }
    }

    /// Returns `NotConnected` error if no active connection.
    pub fn current_handle(&self) -> DbResult<Arc<ConnectionHandle>> {
        self.state
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(DatabaseError::NotConnected)
    }

    /// Same as `manual_connect(config, false)`.
    pub async fn connect(&self, config: ConnectionConfig) -> DbResult<ConnectOutcome> {
        self.manual_connect(config, false).await
    }

    /// Connects, or with `force` replaces an existing handle.
    ///
    /// A forced reconnect tears the old handle down before opening the new
    /// one, so a failed reconnect leaves the manager disconnected.
    pub async fn manual_connect(
        &self,
        config: ConnectionConfig,
        force: bool,
    ) -> DbResult<ConnectOutcome> {
        let _guard = self.mutation.lock().await;

        let existing = self.state.read().as_ref().map(Arc::clone);
        match existing {
            Some(handle) if !force => {
                debug!(handle = handle.id(), "Already connected; skipping reconnect");
                Ok(ConnectOutcome::AlreadyConnected(handle.metadata()))
            }
            Some(_) => {
                info!(
                    "Forcing reconnect to {} (source: {})",
                    config.sanitized_uri(),
                    config.source
                );
                self.teardown_locked().await;
                let metadata = self.open_locked(config).await?;
                Ok(ConnectOutcome::Reconnected(metadata))
            }
            None => {
                let metadata = self.open_locked(config).await?;
                Ok(ConnectOutcome::Connected(metadata))
            }
        }
    }

    /// Closes the current handle. Idempotent.
    pub async fn disconnect(&self) -> DisconnectOutcome {
        let _guard = self.mutation.lock().await;
        match self.teardown_locked().await {
            Some(metadata) => DisconnectOutcome::Disconnected(metadata),
            None => DisconnectOutcome::NotConnected,
        }
    }

    /// Caller must hold `mutation`.
    async fn open_locked(&self, config: ConnectionConfig) -> DbResult<ConnectionMetadata> {
        info!(
            "Connecting to Neo4j at {} (source: {})",
            config.sanitized_uri(),
            config.source
        );

        let attempt = async {
            let driver = self.connector.open(&config).await.inspect_err(|e| {
                warn!("Failed to open Neo4j driver: {}", e);
            })?;

            if let Err(e) = driver.verify_connectivity().await {
                warn!("Neo4j connectivity check failed: {}", e);
                driver.close().await;
                return Err(e);
            }
            Ok::<_, DatabaseError>(driver)
        };

        // A dropped attempt releases its half-opened driver with the future.
        let driver = match tokio::time::timeout(self.connect_timeout, attempt).await {
            Ok(result) => result?,
            Err(_) => {
                let millis = self.connect_timeout.as_millis() as u64;
                warn!(
                    "Gave up connecting to {} after {}ms",
                    config.sanitized_uri(),
                    millis
                );
                return Err(DatabaseError::ConnectTimeout(millis));
            }
        };

        let handle = Arc::new(ConnectionHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            driver,
            config,
            connected_at: Utc::now(),
            connected_instant: Instant::now(),
            token: CancellationToken::new(),
        });
        let metadata = handle.metadata();

        *self.state.write() = Some(handle);

        info!(
            handle = metadata.handle_id,
            "Connected to Neo4j at {}",
            metadata.uri.as_deref().unwrap_or("unknown")
        );
        Ok(metadata)
    }

    /// Caller must hold `mutation`.
    async fn teardown_locked(&self) -> Option<ConnectionMetadata> {
        let handle = self.state.write().take()?;
        let metadata = handle.metadata();

        handle.token.cancel();
        handle.driver.close().await;

        info!(
            handle = handle.id,
            "Disconnected from Neo4j at {}",
            metadata.uri.as_deref().unwrap_or("unknown")
        );
        Some(metadata)
    }
}

impl Clone for ConnectionManager {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            state: Arc::clone(&self.state),
            mutation: Arc::clone(&self.mutation),
            next_id: Arc::clone(&self.next_id),
            connect_timeout: self.connect_timeout,
        }
    }
}
