//! Tool registry for dynamic tool registration.

use crate::database::{ExecutionRequest, QueryExecutor};
use crate::error::{McpError, Result, ToolError};
use crate::protocol::{CallToolParams, CallToolResult, Tool};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Name, description and JSON schema. The schema's `required` list is
    /// enforced by the registry before `execute` is called.
    fn definition(&self) -> Tool;
    async fn execute(&self, arguments: Value) -> Result<CallToolResult>;
}

pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
        }
    }

    pub fn register<T: ToolHandler + 'static>(&self, tool: T) {
        let definition = tool.definition();
        let name = definition.name.clone();
        debug!("Registering tool: {}", name);
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).map(|r| Arc::clone(&*r))
    }

    /// Tool definitions sorted by name.
    pub fn list(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self.tools.iter().map(|r| r.value().definition()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub async fn execute(&self, params: CallToolParams) -> Result<CallToolResult> {
        let tool = self
            .get(&params.name)
            .ok_or_else(|| ToolError::NotFound(params.name.clone()))?;

        check_required(&tool.definition(), &params.arguments)?;
        tool.execute(params.arguments).await
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[macro_export]
macro_rules! define_tool {
    (
        name: $name:expr,
        description: $desc:expr,
        schema: $schema:tt
    ) => {
        $crate::protocol::Tool {
            name: $name.into(),
            description: Some($desc.into()),
            input_schema: serde_json::json!($schema),
        }
    };
}

/// Rejects calls whose required arguments are absent, null or empty strings.
fn check_required(definition: &Tool, arguments: &Value) -> std::result::Result<(), ToolError> {
    let Some(required) = definition.input_schema.get("required").and_then(Value::as_array) else {
        return Ok(());
    };

    let missing: Vec<&str> = required
        .iter()
        .filter_map(Value::as_str)
        .filter(|name| match arguments.get(*name) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ToolError::MissingArguments {
            tool: definition.name.clone(),
            missing: missing.join(", "),
        })
    }
}

/// Deserializes tool arguments; a missing arguments object counts as `{}`.
pub fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(arguments)
        .map_err(|e| ToolError::InvalidArguments(e.to_string()).into())
}

/// Runs a statement through the executor and renders the records as text.
pub async fn run_statement(
    executor: &QueryExecutor,
    request: ExecutionRequest,
) -> Result<CallToolResult> {
    let result = executor.execute(request).await?;
    Ok(CallToolResult::text(result.to_text()))
}

/// Message shown to the caller for a failed tool call.
pub fn error_message(error: &McpError) -> String {
    match error {
        McpError::Tool(e) => e.to_string(),
        McpError::Database(e) => e.to_string(),
        McpError::Config(e) => e.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestTool;

    #[async_trait]
    impl ToolHandler for TestTool {
        fn definition(&self) -> Tool {
            define_tool! {
                name: "test_tool",
                description: "A test tool",
                schema: {
                    "type": "object",
                    "properties": {
                        "a": {"type": "string"},
                        "b": {"type": "string"}
                    },
                    "required": ["a", "b"]
                }
            }
        }

        async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
            Ok(CallToolResult::text("test result"))
        }
    }

    #[test]
    fn test_registry() {
        let registry = ToolRegistry::new();
        registry.register(TestTool);

        assert_eq!(registry.len(), 1);
        assert!(registry.get("test_tool").is_some());
        assert!(registry.get("unknown").is_none());

        let tools = registry.list();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "test_tool");
    }

    #[tokio::test]
    async fn test_execute() {
        let registry = ToolRegistry::new();
        registry.register(TestTool);

        let params = CallToolParams {
            name: "test_tool".into(),
            arguments: serde_json::json!({"a": "x", "b": 1}),
        };

        let result = registry.execute(params).await.unwrap();
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_missing_and_empty_arguments() {
        let registry = ToolRegistry::new();
        registry.register(TestTool);

        let params = CallToolParams {
            name: "test_tool".into(),
            arguments: serde_json::json!({"a": ""}),
        };

        let err = registry.execute(params).await.unwrap_err();
        assert_eq!(
            error_message(&err),
            "Missing required argument(s) for test_tool: a, b"
        );
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let params = CallToolParams {
            name: "nope".into(),
            arguments: Value::Null,
        };

        let err = registry.execute(params).await.unwrap_err();
        assert_eq!(error_message(&err), "Tool not found: nope");
    }

    #[test]
    fn test_parse_args_accepts_null() {
        #[derive(serde::Deserialize)]
        struct Args {
            #[serde(default)]
            force: bool,
        }

        let args: Args = parse_args(Value::Null).unwrap();
        assert!(!args.force);
        assert!(parse_args::<Args>(serde_json::json!({"force": "yes"})).is_err());
    }
}
