//! Ad-hoc Cypher execution tool.

use crate::database::{ExecutionRequest, Parameters, QueryExecutor};
use crate::error::{Result, ToolError};
use crate::protocol::{CallToolResult, Tool};
use crate::tools::registry::{ToolHandler, parse_args, run_statement};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
pub struct RunCypherQueryArgs {
    pub query: String,
    #[serde(default)]
    pub parameters: Option<Parameters>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

pub struct RunCypherQueryTool {
    executor: QueryExecutor,
}

impl RunCypherQueryTool {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ToolHandler for RunCypherQueryTool {
    fn definition(&self) -> Tool {
        crate::define_tool! {
            name: "run_cypher_query",
            description: "Run a Cypher query against the connected Neo4j database",
            schema: {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Cypher query to execute"
                    },
                    "parameters": {
                        "type": "object",
                        "description": "Query parameters, referenced as $name in the query"
                    },
                    "timeout_ms": {
                        "type": "integer",
                        "description": "Per-call timeout in milliseconds (defaults to the server setting)",
                        "minimum": 1
                    }
                },
                "required": ["query"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "run_cypher_query"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: RunCypherQueryArgs = parse_args(arguments)?;

        let timeout = match args.timeout_ms {
            Some(0) => {
                return Err(
                    ToolError::InvalidArguments("timeout_ms must be greater than 0".into()).into(),
                );
            }
            other => other.map(Duration::from_millis),
        };

        debug!(timeout = ?timeout, "Running Cypher query");
        let request = ExecutionRequest::new(args.query)
            .with_parameters(args.parameters.unwrap_or_default())
            .with_timeout(timeout);

        run_statement(&self.executor, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DatabaseError, McpError};
    use crate::tools::testing::connected_executor;
    use serde_json::json;

    #[tokio::test]
    async fn test_runs_query_with_parameters() {
        let (executor, connector) = connected_executor().await;
        let tool = RunCypherQueryTool::new(executor);

        let result = tool
            .execute(json!({
                "query": "MATCH (n {name: $name}) RETURN n",
                "parameters": {"name": "Alice"}
            }))
            .await
            .unwrap();

        assert!(result.text_content().starts_with("Query Results:"));
        let (statement, parameters) = connector.stats().last_statement().unwrap();
        assert_eq!(statement, "MATCH (n {name: $name}) RETURN n");
        assert_eq!(parameters["name"], json!("Alice"));
    }

    #[tokio::test]
    async fn test_empty_result_message() {
        let (executor, _) = connected_executor().await;
        let tool = RunCypherQueryTool::new(executor);

        let result = tool.execute(json!({"query": "ROWS 0"})).await.unwrap();
        assert_eq!(
            result.text_content(),
            "Query executed successfully. No results returned."
        );
    }

    #[tokio::test]
    async fn test_timeout_override() {
        let (executor, _) = connected_executor().await;
        let tool = RunCypherQueryTool::new(executor);

        let err = tool
            .execute(json!({"query": "SLEEP 500", "timeout_ms": 20}))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Database(DatabaseError::Timeout(20))));

        let err = tool
            .execute(json!({"query": "RETURN 1", "timeout_ms": 0}))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Tool(ToolError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let (executor, _) = connected_executor().await;
        let tool = RunCypherQueryTool::new(executor);

        let err = tool.execute(json!({"query": "FAIL"})).await.unwrap_err();
        assert!(err.to_string().contains("Query execution failed"));
    }
}
