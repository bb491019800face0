//! Side-effect-free health snapshot.

use crate::database::{ExecutorMetricsSnapshot, QueryExecutor};
use serde::Serialize;
use std::borrow::Cow;

/// Point-in-time view of connection and gate state.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub server_name: String,
    pub server_version: String,
    pub connected: bool,
    pub sanitized_uri: Option<String>,
    pub uptime_seconds: Option<f64>,
    pub capacity: usize,
    pub available: usize,
    pub in_use: usize,
    pub timeout_seconds: f64,
    pub metrics: ExecutorMetricsSnapshot,
}

impl HealthSnapshot {
    /// Renders one `key=value` pair per line.
    pub fn to_text(&self) -> String {
        let uri = self.sanitized_uri.as_deref().unwrap_or("null");
        let uptime = self
            .uptime_seconds
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "null".to_string());

        let lines = [
            format!("server_name={}", self.server_name),
            format!("server_version={}", self.server_version),
            format!("connected={}", self.connected),
            format!("neo4j_uri={}", uri),
            format!("uptime_seconds={}", uptime),
            format!("max_concurrency={}", self.capacity),
            format!("active_operations={}", self.in_use),
            format!("available_slots={}", self.available),
            format!("default_query_timeout_seconds={}", self.timeout_seconds),
            format!("queries_executed={}", self.metrics.queries_executed),
            format!("query_errors={}", self.metrics.query_errors),
            format!("timeouts={}", self.metrics.timeouts),
            format!("connection_errors={}", self.metrics.connection_errors),
        ];

        format!("Health Check:\n{}", lines.join("\n"))
    }
}

/// Builds [`HealthSnapshot`]s from the executor and its connection manager.
#[derive(Clone)]
pub struct HealthReporter {
    executor: QueryExecutor,
    server_name: Cow<'static, str>,
    server_version: Cow<'static, str>,
}

impl HealthReporter {
    pub fn new(
        executor: QueryExecutor,
        server_name: impl Into<Cow<'static, str>>,
        server_version: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            executor,
            server_name: server_name.into(),
            server_version: server_version.into(),
        }
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let handle = self.executor.connections().current_handle().ok();
        let gate = self.executor.gate();

        HealthSnapshot {
            server_name: self.server_name.to_string(),
            server_version: self.server_version.to_string(),
            connected: handle.is_some(),
            sanitized_uri: handle.as_ref().map(|h| h.config().sanitized_uri()),
            uptime_seconds: handle.as_ref().map(|h| h.uptime().as_secs_f64()),
            capacity: gate.capacity(),
            available: gate.available_permits(),
            in_use: gate.in_use(),
            timeout_seconds: self.executor.config().query_timeout.as_secs_f64(),
            metrics: self.executor.metrics(),
        }
    }
}
