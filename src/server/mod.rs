//! MCP server implementation.

pub mod handler;
pub mod health;
pub mod startup;
pub mod state;

pub use handler::McpHandler;
pub use health::{HealthReporter, HealthSnapshot};
pub use startup::eager_connect;
pub use state::{ServerState, ServerStateBuilder};
