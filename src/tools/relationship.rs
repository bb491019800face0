//! Relationship tools.

use crate::database::{ExecutionRequest, Parameters, QueryExecutor};
use crate::error::Result;
use crate::protocol::{CallToolResult, Tool};
use crate::security::check_identifier;
use crate::tools::entity_match;
use crate::tools::registry::{ToolHandler, parse_args, run_statement};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

/// `WHERE` clause matching both endpoints by name, id or element id.
fn endpoints_match() -> String {
    format!(
        "{} AND {}",
        entity_match("source", "source_id"),
        entity_match("target", "target_id")
    )
}

#[derive(Debug, Deserialize)]
struct CreateRelationArgs {
    source_id: String,
    target_id: String,
    relationship_type: String,
    #[serde(default)]
    properties: Option<Parameters>,
}

fn create_relation_request(args: CreateRelationArgs) -> Result<ExecutionRequest> {
    check_identifier("relationship_type", &args.relationship_type)?;

    let statement = format!(
        "MATCH (source), (target) WHERE {} CREATE (source)-[r:{} $properties]->(target) RETURN r",
        endpoints_match(),
        args.relationship_type
    );
    Ok(ExecutionRequest::new(statement)
        .with_param("source_id", args.source_id)
        .with_param("target_id", args.target_id)
        .with_param("properties", Value::Object(args.properties.unwrap_or_default())))
}

pub struct CreateRelationsTool {
    executor: QueryExecutor,
}

impl CreateRelationsTool {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ToolHandler for CreateRelationsTool {
    fn definition(&self) -> Tool {
        crate::define_tool! {
            name: "create_relations",
            description: "Create relationships between entities",
            schema: {
                "type": "object",
                "properties": {
                    "source_id": {
                        "type": "string",
                        "description": "Source entity identifier"
                    },
                    "target_id": {
                        "type": "string",
                        "description": "Target entity identifier"
                    },
                    "relationship_type": {
                        "type": "string",
                        "description": "Type of relationship (e.g., 'KNOWS', 'LIVES_IN', 'WORKS_FOR')"
                    },
                    "properties": {
                        "type": "object",
                        "description": "Properties of the relationship (optional)"
                    }
                },
                "required": ["source_id", "target_id", "relationship_type"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "create_relations"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: CreateRelationArgs = parse_args(arguments)?;
        run_statement(&self.executor, create_relation_request(args)?).await
    }
}

#[derive(Debug, Deserialize)]
struct DeleteRelationArgs {
    source_id: String,
    target_id: String,
    #[serde(default)]
    relationship_type: Option<String>,
}

fn delete_relation_request(args: DeleteRelationArgs) -> Result<ExecutionRequest> {
    let relationship = match args.relationship_type.as_deref().filter(|t| !t.is_empty()) {
        Some(relationship_type) => {
            check_identifier("relationship_type", relationship_type)?;
            format!("[r:{}]", relationship_type)
        }
        None => "[r]".to_string(),
    };

    let statement = format!(
        "MATCH (source)-{}->(target) WHERE {} DELETE r RETURN count(r) as deleted_count",
        relationship,
        endpoints_match()
    );
    Ok(ExecutionRequest::new(statement)
        .with_param("source_id", args.source_id)
        .with_param("target_id", args.target_id))
}

pub struct DeleteRelationsTool {
    executor: QueryExecutor,
}

impl DeleteRelationsTool {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ToolHandler for DeleteRelationsTool {
    fn definition(&self) -> Tool {
        crate::define_tool! {
            name: "delete_relations",
            description: "Delete relationships between entities",
            schema: {
                "type": "object",
                "properties": {
                    "source_id": {
                        "type": "string",
                        "description": "Source entity identifier"
                    },
                    "target_id": {
                        "type": "string",
                        "description": "Target entity identifier"
                    },
                    "relationship_type": {
                        "type": "string",
                        "description": "Specific relationship type to delete (optional, deletes all if not specified)"
                    }
                },
                "required": ["source_id", "target_id"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "delete_relations"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: DeleteRelationArgs = parse_args(arguments)?;
        run_statement(&self.executor, delete_relation_request(args)?).await
    }
}
