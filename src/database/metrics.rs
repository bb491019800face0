//! Executor counters.

use crate::error::{DatabaseError, ErrorKind};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Execution metrics for monitoring.
#[derive(Debug, Default)]
pub struct ExecutorMetrics {
    pub queries_executed: AtomicU64,
    pub query_errors: AtomicU64,
    pub timeouts: AtomicU64,
    pub connection_errors: AtomicU64,
}

impl ExecutorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, error: &DatabaseError) {
        let counter = match error.kind() {
            ErrorKind::Timeout => &self.timeouts,
            ErrorKind::Connection | ErrorKind::Config => &self.connection_errors,
            ErrorKind::QueryFailed => &self.query_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ExecutorMetricsSnapshot {
        ExecutorMetricsSnapshot {
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            query_errors: self.query_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of executor metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecutorMetricsSnapshot {
    pub queries_executed: u64,
    pub query_errors: u64,
    pub timeouts: u64,
    pub connection_errors: u64,
}
