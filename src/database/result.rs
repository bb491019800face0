//! Execution request and result types.

use crate::database::traits::{Parameters, Record};
use serde::Serialize;
use std::time::Duration;

/// Maximum length of rendered result text, in characters.
pub const MAX_RESULT_TEXT: usize = 10_000;

const TRUNCATION_SUFFIX: &str = "… (truncated)";

/// One statement to run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionRequest {
    pub statement: String,
    pub parameters: Parameters,
    /// Overrides the configured query timeout.
    pub timeout: Option<Duration>,
}

impl ExecutionRequest {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            ..Default::default()
        }
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Records produced by a statement.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub records: Vec<Record>,
    pub records_returned: usize,
    /// The statement produced more records than the configured cap.
    pub truncated: bool,
    pub execution_time_ms: u64,
}

impl ExecutionResult {
    pub fn new(records: Vec<Record>, truncated: bool, execution_time_ms: u64) -> Self {
        Self {
            records_returned: records.len(),
            records,
            truncated,
            execution_time_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Renders records as `Record i: {json}` lines under a `Query Results:`
    /// header, capped at [`MAX_RESULT_TEXT`] characters.
    pub fn to_text(&self) -> String {
        if self.records.is_empty() {
            return "Query executed successfully. No results returned.".to_string();
        }

        let mut text = String::from("Query Results:\n");
        for (i, record) in self.records.iter().enumerate() {
            let json = serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string());
            text.push_str(&format!("Record {}: {}\n", i + 1, json));
        }
        if self.truncated {
            text.push_str(&format!(
                "(showing the first {} records; more were available)\n",
                self.records_returned
            ));
        }

        truncate_text(text, MAX_RESULT_TEXT)
    }
}

/// Cuts `text` to `limit` characters and appends a truncation marker.
pub fn truncate_text(text: String, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => {
            let mut cut = text[..byte_idx].to_string();
            cut.push_str(TRUNCATION_SUFFIX);
            cut
        }
        None => text,
    }
}
