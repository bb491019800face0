//! Observation tools.
//!
//! Observations are `(:Observation)` nodes linked to an entity through a
//! `HAS_OBSERVATION` relationship.

use crate::database::{ExecutionRequest, QueryExecutor};
use crate::error::{Result, ToolError};
use crate::protocol::{CallToolResult, Tool};
use crate::tools::entity_match;
use crate::tools::registry::{ToolHandler, parse_args, run_statement};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

#[derive(Debug, Deserialize)]
struct AddObservationArgs {
    entity_id: String,
    observation_text: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    confidence: Option<Value>,
    #[serde(default)]
    tags: Vec<String>,
}

fn check_confidence(confidence: Option<&Value>) -> Result<Option<f64>> {
    let Some(value) = confidence.filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let confidence = value
        .as_f64()
        .ok_or_else(|| ToolError::InvalidArguments("Confidence must be a number".into()))?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(
            ToolError::InvalidArguments("Confidence must be between 0.0 and 1.0".into()).into(),
        );
    }
    Ok(Some(confidence))
}

fn add_observation_request(args: AddObservationArgs) -> Result<ExecutionRequest> {
    let confidence = check_confidence(args.confidence.as_ref())?;
    let timestamp = args
        .timestamp
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| Utc::now().to_rfc3339());

    let statement = format!(
        "MATCH (entity) WHERE {} \
         CREATE (entity)-[r:HAS_OBSERVATION]->(obs:Observation {{text: $observation_text, \
         timestamp: $timestamp, source: $source, confidence: $confidence, tags: $tags}}) \
         RETURN obs",
        entity_match("entity", "entity_id")
    );

    Ok(ExecutionRequest::new(statement)
        .with_param("entity_id", args.entity_id)
        .with_param("observation_text", args.observation_text)
        .with_param("timestamp", timestamp)
        .with_param("source", args.source)
        .with_param("confidence", confidence)
        .with_param("tags", args.tags))
}

pub struct AddObservationsTool {
    executor: QueryExecutor,
}

impl AddObservationsTool {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ToolHandler for AddObservationsTool {
    fn definition(&self) -> Tool {
        crate::define_tool! {
            name: "add_observations",
            description: "Add observation statements to entities",
            schema: {
                "type": "object",
                "properties": {
                    "entity_id": {
                        "type": "string",
                        "description": "Target entity identifier"
                    },
                    "observation_text": {
                        "type": "string",
                        "description": "The observation statement to add"
                    },
                    "timestamp": {
                        "type": "string",
                        "description": "Timestamp for the observation (optional, uses current time if not provided)"
                    },
                    "source": {
                        "type": "string",
                        "description": "Source of the observation (optional)"
                    },
                    "confidence": {
                        "type": "number",
                        "description": "Confidence level of the observation (0.0 to 1.0, optional)"
                    },
                    "tags": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Tags for categorizing the observation (optional)"
                    }
                },
                "required": ["entity_id", "observation_text"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "add_observations"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: AddObservationArgs = parse_args(arguments)?;
        run_statement(&self.executor, add_observation_request(args)?).await
    }
}

#[derive(Debug, Deserialize)]
struct DeleteObservationArgs {
    entity_id: String,
    #[serde(default)]
    observation_id: Option<String>,
    #[serde(default)]
    observation_text: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Which observations of an entity to delete. Only the first filter supplied
/// applies, in field order.
#[derive(Debug, PartialEq)]
enum ObservationFilter {
    Id(String),
    Text(String),
    Source(String),
    Tags(Vec<String>),
    All,
}

impl ObservationFilter {
    fn select(args: &mut DeleteObservationArgs) -> Self {
        let present = |value: &mut Option<String>| value.take().filter(|v| !v.is_empty());

        if let Some(id) = present(&mut args.observation_id) {
            Self::Id(id)
        } else if let Some(text) = present(&mut args.observation_text) {
            Self::Text(text)
        } else if let Some(source) = present(&mut args.source) {
            Self::Source(source)
        } else if !args.tags.is_empty() {
            Self::Tags(std::mem::take(&mut args.tags))
        } else {
            Self::All
        }
    }

    fn apply(self, request: ExecutionRequest) -> (Option<&'static str>, ExecutionRequest) {
        match self {
            Self::Id(id) => (
                Some("elementId(obs) = $observation_id"),
                request.with_param("observation_id", id),
            ),
            Self::Text(text) => (
                Some("obs.text CONTAINS $observation_text"),
                request.with_param("observation_text", text),
            ),
            Self::Source(source) => (
                Some("obs.source = $source"),
                request.with_param("source", source),
            ),
            Self::Tags(tags) => (
                Some("ANY(tag IN $tags WHERE tag IN obs.tags)"),
                request.with_param("tags", tags),
            ),
            Self::All => (None, request),
        }
    }
}

fn delete_observation_request(mut args: DeleteObservationArgs) -> ExecutionRequest {
    let filter = ObservationFilter::select(&mut args);
    let (condition, request) =
        filter.apply(ExecutionRequest::default().with_param("entity_id", args.entity_id));

    let mut statement = format!(
        "MATCH (entity)-[r:HAS_OBSERVATION]->(obs:Observation) WHERE {}",
        entity_match("entity", "entity_id")
    );
    if let Some(condition) = condition {
        statement.push_str(" AND ");
        statement.push_str(condition);
    }
    statement.push_str(" DELETE r, obs RETURN count(obs) as deleted_count");

    ExecutionRequest {
        statement,
        ..request
    }
}

pub struct DeleteObservationsTool {
    executor: QueryExecutor,
}

impl DeleteObservationsTool {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ToolHandler for DeleteObservationsTool {
    fn definition(&self) -> Tool {
        crate::define_tool! {
            name: "delete_observations",
            description: "Delete observation statements from entities",
            schema: {
                "type": "object",
                "properties": {
                    "entity_id": {
                        "type": "string",
                        "description": "Target entity identifier"
                    },
                    "observation_id": {
                        "type": "string",
                        "description": "Specific observation element ID to delete (optional, deletes all if not specified)"
                    },
                    "observation_text": {
                        "type": "string",
                        "description": "Observation text to match for deletion (optional)"
                    },
                    "source": {
                        "type": "string",
                        "description": "Source filter for deletion (optional)"
                    },
                    "tags": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Tags filter for deletion (optional)"
                    }
                },
                "required": ["entity_id"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "delete_observations"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: DeleteObservationArgs = parse_args(arguments)?;
        run_statement(&self.executor, delete_observation_request(args)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry::error_message;
    use crate::tools::testing::connected_executor;
    use serde_json::json;

    fn add(args: Value) -> Result<ExecutionRequest> {
        add_observation_request(serde_json::from_value(args).unwrap())
    }

    fn delete(args: Value) -> ExecutionRequest {
        delete_observation_request(serde_json::from_value(args).unwrap())
    }

    #[test]
    fn test_add_defaults() {
        let request = add(json!({"entity_id": "Alice", "observation_text": "Likes tea"})).unwrap();

        assert!(
            request
                .statement
                .contains("CREATE (entity)-[r:HAS_OBSERVATION]->(obs:Observation {text: $observation_text")
        );
        assert_eq!(request.parameters["source"], Value::Null);
        assert_eq!(request.parameters["confidence"], Value::Null);
        assert_eq!(request.parameters["tags"], json!([]));

        let timestamp = request.parameters["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn test_add_keeps_supplied_values() {
        let request = add(json!({
            "entity_id": "Alice",
            "observation_text": "Likes tea",
            "timestamp": "2024-01-01T00:00:00",
            "source": "chat",
            "confidence": 0.75,
            "tags": ["food"]
        }))
        .unwrap();

        assert_eq!(request.parameters["timestamp"], json!("2024-01-01T00:00:00"));
        assert_eq!(request.parameters["confidence"], json!(0.75));
        assert_eq!(request.parameters["tags"], json!(["food"]));
    }

    #[test]
    fn test_confidence_validation() {
        let base = |confidence: Value| {
            add(json!({"entity_id": "a", "observation_text": "b", "confidence": confidence}))
        };

        let err = base(json!("high")).unwrap_err();
        assert_eq!(error_message(&err), "Invalid arguments: Confidence must be a number");

        let err = base(json!(1.5)).unwrap_err();
        assert_eq!(
            error_message(&err),
            "Invalid arguments: Confidence must be between 0.0 and 1.0"
        );

        assert!(base(json!(0)).is_ok());
        assert!(base(json!(1)).is_ok());
    }

    #[test]
    fn test_delete_filter_priority() {
        let request = delete(json!({
            "entity_id": "Alice",
            "observation_text": "tea",
            "source": "chat"
        }));
        assert!(request.statement.contains("AND obs.text CONTAINS $observation_text"));
        assert!(!request.statement.contains("obs.source"));
        assert!(!request.parameters.contains_key("source"));

        let request = delete(json!({
            "entity_id": "Alice",
            "observation_id": "4:abc:1",
            "tags": ["x"]
        }));
        assert!(request.statement.contains("AND elementId(obs) = $observation_id"));

        let request = delete(json!({"entity_id": "Alice", "tags": ["x"]}));
        assert!(request.statement.contains("AND ANY(tag IN $tags WHERE tag IN obs.tags)"));
    }

    #[test]
    fn test_delete_all_observations() {
        let request = delete(json!({"entity_id": "Alice", "tags": []}));
        assert_eq!(
            request.statement,
            "MATCH (entity)-[r:HAS_OBSERVATION]->(obs:Observation) WHERE \
             (entity.name = $entity_id OR entity.id = $entity_id OR elementId(entity) = $entity_id) \
             DELETE r, obs RETURN count(obs) as deleted_count"
        );
        assert_eq!(request.parameters.len(), 1);
    }

    #[tokio::test]
    async fn test_add_runs_through_executor() {
        let (executor, connector) = connected_executor().await;
        let tool = AddObservationsTool::new(executor);

        tool.execute(json!({"entity_id": "Alice", "observation_text": "Likes tea"}))
            .await
            .unwrap();

        let (statement, parameters) = connector.stats().last_statement().unwrap();
        assert!(statement.ends_with("RETURN obs"));
        assert_eq!(parameters["observation_text"], json!("Likes tea"));
    }
}
