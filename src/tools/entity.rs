//! Memory entity (node) tools.

use crate::database::{ExecutionRequest, QueryExecutor};
use crate::error::{Result, ToolError};
use crate::protocol::{CallToolResult, Tool};
use crate::security::check_identifier;
use crate::tools::entity_match;
use crate::tools::registry::{ToolHandler, parse_args, run_statement};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

#[derive(Debug, Deserialize)]
struct CreateEntityArgs {
    entity_type: String,
    properties: Value,
    #[serde(default)]
    labels: Vec<String>,
}

fn create_entity_request(args: CreateEntityArgs) -> Result<ExecutionRequest> {
    let Value::Object(properties) = args.properties else {
        return Err(ToolError::InvalidArguments("Properties must be a dictionary".into()).into());
    };
    if !properties.contains_key("name") && !properties.contains_key("id") {
        return Err(
            ToolError::InvalidArguments("Name or id property is required".into()).into(),
        );
    }

    check_identifier("entity_type", &args.entity_type)?;
    for label in &args.labels {
        check_identifier("labels", label)?;
    }

    let labels = std::iter::once(args.entity_type.as_str())
        .chain(args.labels.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(":");

    let statement = format!("CREATE (n:{} $properties) RETURN n", labels);
    Ok(ExecutionRequest::new(statement).with_param("properties", Value::Object(properties)))
}

pub struct CreateEntitiesTool {
    executor: QueryExecutor,
}

impl CreateEntitiesTool {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ToolHandler for CreateEntitiesTool {
    fn definition(&self) -> Tool {
        crate::define_tool! {
            name: "create_entities",
            description: "Create memory entities (nodes) in the graph",
            schema: {
                "type": "object",
                "properties": {
                    "entity_type": {
                        "type": "string",
                        "description": "Type/category of entity (e.g., 'Person', 'Place', 'Concept')"
                    },
                    "properties": {
                        "type": "object",
                        "description": "Properties of the entity (must include 'name' or 'id')"
                    },
                    "labels": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Additional labels for the entity (optional)"
                    }
                },
                "required": ["entity_type", "properties"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "create_entities"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: CreateEntityArgs = parse_args(arguments)?;
        run_statement(&self.executor, create_entity_request(args)?).await
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct DeleteEntityArgs {
    entity_id: String,
    #[serde(default)]
    entity_type: Option<String>,
    #[serde(default = "default_true")]
    delete_relationships: bool,
}

fn delete_entity_request(args: DeleteEntityArgs) -> Result<ExecutionRequest> {
    let pattern = match args.entity_type.as_deref().filter(|t| !t.is_empty()) {
        Some(entity_type) => {
            check_identifier("entity_type", entity_type)?;
            format!("(n:{})", entity_type)
        }
        None => "(n)".to_string(),
    };

    let delete = if args.delete_relationships {
        "OPTIONAL MATCH (n)-[r]-() DELETE r, n"
    } else {
        "DELETE n"
    };

    let statement = format!(
        "MATCH {} WHERE {} {} RETURN count(n) as deleted_count",
        pattern,
        entity_match("n", "entity_id"),
        delete
    );
    Ok(ExecutionRequest::new(statement).with_param("entity_id", args.entity_id))
}

pub struct DeleteEntitiesTool {
    executor: QueryExecutor,
}

impl DeleteEntitiesTool {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ToolHandler for DeleteEntitiesTool {
    fn definition(&self) -> Tool {
        crate::define_tool! {
            name: "delete_entities",
            description: "Delete memory entities (nodes) from the graph",
            schema: {
                "type": "object",
                "properties": {
                    "entity_id": {
                        "type": "string",
                        "description": "Entity identifier (name, id, or internal Neo4j element ID)"
                    },
                    "entity_type": {
                        "type": "string",
                        "description": "Type/category of entity to filter by (optional)"
                    },
                    "delete_relationships": {
                        "type": "boolean",
                        "description": "Whether to also delete relationships (default: true)",
                        "default": true
                    }
                },
                "required": ["entity_id"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "delete_entities"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: DeleteEntityArgs = parse_args(arguments)?;
        run_statement(&self.executor, delete_entity_request(args)?).await
    }
}
