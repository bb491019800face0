//! In-memory mock driver for testing.
//!
//! Statements drive the behaviour of a [`MockSession`]:
//!
//! - `SLEEP <ms>` waits, then returns one record
//! - `FAIL` returns a query failure
//! - `ROWS <n>` streams `n` records
//! - anything else echoes the statement and its parameters as one record
//!
//! Conditionally compiled with `#[cfg(test)]`.

use crate::config::ConnectionConfig;
use crate::database::traits::{Connector, GraphDriver, GraphSession, Parameters, Record};
use crate::database::uri::redact;
use crate::error::{DatabaseError, DbResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Counters shared by a connector and everything it opens.
#[derive(Debug, Default)]
pub struct MockStats {
    pub drivers_opened: AtomicUsize,
    pub drivers_closed: AtomicUsize,
    pub sessions_opened: AtomicUsize,
    pub sessions_closed: AtomicUsize,
    pub running: AtomicUsize,
    pub max_running: AtomicUsize,
    pub statements: Mutex<Vec<(String, Parameters)>>,
}

impl MockStats {
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.sessions_closed.load(Ordering::SeqCst)
    }

    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    pub fn drivers_closed(&self) -> usize {
        self.drivers_closed.load(Ordering::SeqCst)
    }

    /// Last statement run and its parameters.
    pub fn last_statement(&self) -> Option<(String, Parameters)> {
        self.statements.lock().last().cloned()
    }
}

/// Connector producing [`MockDriver`]s.
#[derive(Default)]
pub struct MockConnector {
    stats: Arc<MockStats>,
    fail_connect: AtomicBool,
    hang_connect: AtomicBool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }

    /// Makes subsequent connectivity checks fail.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.fail_connect.store(unreachable, Ordering::SeqCst);
    }

    /// Makes subsequent connectivity checks never answer, like a host that
    /// drops every packet.
    pub fn set_hanging(&self, hanging: bool) {
        self.hang_connect.store(hanging, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, config: &ConnectionConfig) -> DbResult<Arc<dyn GraphDriver>> {
        self.stats.drivers_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockDriver {
            stats: Arc::clone(&self.stats),
            config: config.clone(),
            unreachable: self.fail_connect.load(Ordering::SeqCst),
            hanging: self.hang_connect.load(Ordering::SeqCst),
            closed: AtomicBool::new(false),
        }))
    }
}

pub struct MockDriver {
    stats: Arc<MockStats>,
    config: ConnectionConfig,
    unreachable: bool,
    hanging: bool,
    closed: AtomicBool,
}

#[async_trait]
impl GraphDriver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn verify_connectivity(&self) -> DbResult<()> {
        if self.hanging {
            std::future::pending::<()>().await;
        }
        if self.unreachable {
            // Mimics a driver that echoes the raw URI and password.
            let message = format!(
                "Could not reach {} with password {}",
                self.config.uri, self.config.password
            );
            return Err(DatabaseError::ConnectionFailed(redact(&message, &self.config)));
        }
        Ok(())
    }

    async fn open_session(&self) -> DbResult<Box<dyn GraphSession>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DatabaseError::ConnectionClosed);
        }
        self.stats.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            stats: Arc::clone(&self.stats),
        }))
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.stats.drivers_closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub struct MockSession {
    stats: Arc<MockStats>,
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.stats.sessions_closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Tracks concurrently running statements.
struct Running(Arc<MockStats>);

impl Running {
    fn enter(stats: &Arc<MockStats>) -> Self {
        let now = stats.running.fetch_add(1, Ordering::SeqCst) + 1;
        stats.max_running.fetch_max(now, Ordering::SeqCst);
        Self(Arc::clone(stats))
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        self.0.running.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GraphSession for MockSession {
    async fn run(
        &mut self,
        statement: &str,
        parameters: &Parameters,
        max_records: usize,
    ) -> DbResult<(Vec<Record>, bool)> {
        let _running = Running::enter(&self.stats);
        self.stats
            .statements
            .lock()
            .push((statement.to_string(), parameters.clone()));

        let mut words = statement.split_whitespace();
        match (words.next(), words.next().and_then(|n| n.parse::<u64>().ok())) {
            (Some("SLEEP"), Some(ms)) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok((vec![record(json!({ "slept_ms": ms }))], false))
            }
            (Some("FAIL"), _) => Err(DatabaseError::QueryFailed(
                "Invalid input 'FAIL': expected a clause".into(),
            )),
            (Some("ROWS"), Some(n)) => {
                let n = n as usize;
                let records = (0..n.min(max_records))
                    .map(|i| record(json!({ "i": i })))
                    .collect();
                Ok((records, n > max_records))
            }
            _ => Ok((
                vec![record(json!({
                    "statement": statement,
                    "parameters": Value::Object(parameters.clone()),
                }))],
                false,
            )),
        }
    }
}

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}
