//! Cypher statement and identifier validation.
//!
//! Statements are checked for emptiness and length before any permit is
//! taken. Destructive statements are allowed but logged. Labels and
//! relationship types interpolated into templates must be plain identifiers.

use crate::error::{DatabaseError, DbResult, ToolError};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// `DETACH DELETE` anywhere in a statement.
static DETACH_DELETE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bDETACH\s+DELETE\b").expect("Invalid regex: detach delete pattern")
});

/// Label, relationship type or property key usable without quoting.
static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid regex: identifier pattern")
});

/// Cypher statement validator.
#[derive(Debug, Clone)]
pub struct CypherValidator {
    max_query_length: usize,
}

impl Default for CypherValidator {
    fn default() -> Self {
        Self {
            max_query_length: 10_000,
        }
    }
}

impl CypherValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_query_length(mut self, length: usize) -> Self {
        self.max_query_length = length;
        self
    }

    /// Validates a statement before execution.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidQuery`] for empty or oversized statements.
    pub fn validate(&self, statement: &str) -> DbResult<()> {
        if statement.trim().is_empty() {
            return Err(DatabaseError::InvalidQuery(
                "Query must be a non-empty string".into(),
            ));
        }

        let length = statement.chars().count();
        if length > self.max_query_length {
            return Err(DatabaseError::InvalidQuery(
                format!("Query too long (>{} chars)", self.max_query_length).into(),
            ));
        }

        if DETACH_DELETE_REGEX.is_match(statement) {
            debug!("Executing a DETACH DELETE statement");
        }

        Ok(())
    }
}

/// Checks that `value` can be interpolated as a label, relationship type or
/// property key.
pub fn check_identifier(field: &str, value: &str) -> Result<(), ToolError> {
    if IDENTIFIER_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(ToolError::InvalidArguments(format!(
            "'{}' must be a plain identifier (letters, digits, underscore), got '{}'",
            field, value
        )))
    }
}
