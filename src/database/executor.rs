//! Gated, timeout-bounded statement execution.
//!
//! Every database call in the server goes through [`QueryExecutor::execute`].
//! The gate permit and the session are owned by the execute future, so both
//! are released on success, failure, timeout and cancellation alike.

use crate::config::ExecutorConfig;
use crate::database::connection::ConnectionManager;
use crate::database::gate::ConcurrencyGate;
use crate::database::metrics::{ExecutorMetrics, ExecutorMetricsSnapshot};
use crate::database::result::{ExecutionRequest, ExecutionResult};
use crate::error::{DatabaseError, DbResult};
use crate::security::CypherValidator;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Runs statements against the current connection handle.
#[derive(Clone)]
pub struct QueryExecutor {
    connections: ConnectionManager,
    gate: ConcurrencyGate,
    validator: CypherValidator,
    config: ExecutorConfig,
    metrics: Arc<ExecutorMetrics>,
}

impl QueryExecutor {
    pub fn new(connections: ConnectionManager, config: ExecutorConfig) -> Self {
        let gate = ConcurrencyGate::new(config.max_concurrency)
            .with_acquire_timeout(config.acquire_timeout);
        let validator = CypherValidator::new().max_query_length(config.max_query_length);

        Self {
            connections,
            gate,
            validator,
            config,
            metrics: Arc::new(ExecutorMetrics::new()),
        }
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn metrics(&self) -> ExecutorMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Executes one statement.
    ///
    /// # Errors
    ///
    /// - [`DatabaseError::InvalidQuery`] if validation fails (no permit is taken)
    /// - [`DatabaseError::NotConnected`] if there is no handle
    /// - [`DatabaseError::Timeout`] / [`DatabaseError::PermitTimeout`] when a bound elapses
    /// - [`DatabaseError::ConnectionClosed`] if the handle is torn down mid-flight
    /// - [`DatabaseError::QueryFailed`] for database-reported failures
    #[instrument(skip(self, request), fields(statement_len = request.statement.len()))]
    pub async fn execute(&self, request: ExecutionRequest) -> DbResult<ExecutionResult> {
        let result = self.run(&request).await;

        match &result {
            Ok(result) => {
                self.metrics.record_success();
                debug!(
                    "Statement returned {} records in {}ms (truncated: {})",
                    result.records_returned, result.execution_time_ms, result.truncated
                );
            }
            Err(e) => {
                self.metrics.record_error(e);
                warn!(kind = %e.kind(), "Statement failed: {}", e);
            }
        }

        result
    }

    async fn run(&self, request: &ExecutionRequest) -> DbResult<ExecutionResult> {
        self.validator.validate(&request.statement)?;

        let _permit = self.gate.acquire().await?;
        let handle = self.connections.current_handle()?;

        let timeout = request.timeout.unwrap_or(self.config.query_timeout);
        let max_records = self.config.max_records;
        let started = Instant::now();

        let work = async {
            let mut session = handle.driver().open_session().await?;
            session
                .run(&request.statement, &request.parameters, max_records)
                .await
        };

        let (records, truncated) = tokio::select! {
            biased;
            _ = handle.closed() => Err(DatabaseError::ConnectionClosed),
            outcome = tokio::time::timeout(timeout, work) => {
                outcome.unwrap_or(Err(DatabaseError::Timeout(timeout.as_millis() as u64)))
            }
        }?;

        Ok(ExecutionResult::new(
            records,
            truncated,
            started.elapsed().as_millis() as u64,
        ))
    }
}
