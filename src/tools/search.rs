//! Node lookup tools.

use crate::database::{ExecutionRequest, QueryExecutor};
use crate::error::Result;
use crate::protocol::{CallToolResult, Tool};
use crate::security::check_identifier;
use crate::tools::registry::{ToolHandler, parse_args, run_statement};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

/// Properties searched when `search_nodes` is not given a property name.
const DEFAULT_SEARCH_PROPERTIES: [&str; 3] = ["name", "city", "occupation"];

const RESULT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct FindNodesArgs {
    name: String,
    #[serde(default)]
    exact_match: bool,
    #[serde(default)]
    case_sensitive: bool,
}

/// Wraps `expr` in `toLower` unless matching is case sensitive.
fn fold_case(expr: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        expr.to_string()
    } else {
        format!("toLower({})", expr)
    }
}

fn find_nodes_request(args: FindNodesArgs) -> ExecutionRequest {
    let operator = if args.exact_match { "=" } else { "CONTAINS" };
    let statement = format!(
        "MATCH (n) WHERE {} {} {} RETURN n LIMIT {}",
        fold_case("n.name", args.case_sensitive),
        operator,
        fold_case("$name", args.case_sensitive),
        RESULT_LIMIT
    );
    ExecutionRequest::new(statement).with_param("name", args.name)
}

pub struct FindNodesTool {
    executor: QueryExecutor,
}

impl FindNodesTool {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ToolHandler for FindNodesTool {
    fn definition(&self) -> Tool {
        crate::define_tool! {
            name: "find_nodes",
            description: "Find nodes by name (exact or partial match)",
            schema: {
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Name to search for"
                    },
                    "exact_match": {
                        "type": "boolean",
                        "description": "Whether to use exact matching (default: false)",
                        "default": false
                    },
                    "case_sensitive": {
                        "type": "boolean",
                        "description": "Whether the search is case sensitive (default: false)",
                        "default": false
                    }
                },
                "required": ["name"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "find_nodes"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: FindNodesArgs = parse_args(arguments)?;
        run_statement(&self.executor, find_nodes_request(args)).await
    }
}

#[derive(Debug, Deserialize)]
struct SearchNodesArgs {
    search_string: String,
    #[serde(default)]
    property_name: Option<String>,
    #[serde(default)]
    case_sensitive: bool,
}

fn search_nodes_request(args: SearchNodesArgs) -> Result<ExecutionRequest> {
    let needle = fold_case("$search_string", args.case_sensitive);
    let contains = |property: &str| {
        format!(
            "{} CONTAINS {}",
            fold_case(&format!("n.{}", property), args.case_sensitive),
            needle
        )
    };

    let condition = match args.property_name.as_deref().filter(|p| !p.is_empty()) {
        Some(property) => {
            check_identifier("property_name", property)?;
            contains(property)
        }
        None => DEFAULT_SEARCH_PROPERTIES
            .iter()
            .map(|&p| format!("({})", contains(p)))
            .collect::<Vec<_>>()
            .join(" OR "),
    };

    let statement = format!(
        "MATCH (n) WHERE {} RETURN n LIMIT {}",
        condition, RESULT_LIMIT
    );
    Ok(ExecutionRequest::new(statement).with_param("search_string", args.search_string))
}

pub struct SearchNodesTool {
    executor: QueryExecutor,
}

impl SearchNodesTool {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ToolHandler for SearchNodesTool {
    fn definition(&self) -> Tool {
        crate::define_tool! {
            name: "search_nodes",
            description: "Search nodes by string in any property",
            schema: {
                "type": "object",
                "properties": {
                    "search_string": {
                        "type": "string",
                        "description": "String to search for in node properties"
                    },
                    "property_name": {
                        "type": "string",
                        "description": "Specific property to search in (optional; searches name, city and occupation if not specified)"
                    },
                    "case_sensitive": {
                        "type": "boolean",
                        "description": "Whether the search is case sensitive (default: false)",
                        "default": false
                    }
                },
                "required": ["search_string"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "search_nodes"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: SearchNodesArgs = parse_args(arguments)?;
        run_statement(&self.executor, search_nodes_request(args)?).await
    }
}
