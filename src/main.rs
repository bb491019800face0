//! MCP server binary entry point.

use anyhow::Result;
use clap::Parser;
use neo4j_mcp_server::{
    config::{
        CredentialResolver, CredentialSource, ExecutorConfig, PartialCredentials, ServerConfig,
        credentials::load_env_file,
    },
    database::{ConnectionManager, Neo4jConnector},
    protocol::McpServerBuilder,
    server::{McpHandler, ServerStateBuilder, eager_connect},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// Neo4j MCP server over stdio.
#[derive(Debug, Parser)]
#[command(name = "neo4j-mcp-server", version, about)]
struct Cli {
    /// Neo4j connection URI (e.g. neo4j://localhost:7687)
    #[arg(long)]
    neo4j_uri: Option<String>,

    /// Neo4j username
    #[arg(long)]
    neo4j_username: Option<String>,

    /// Neo4j password
    #[arg(long)]
    neo4j_password: Option<String>,

    /// Maximum number of concurrent database operations
    #[arg(long, env = "NEO4J_MAX_CONCURRENCY", default_value_t = 10)]
    max_concurrency: usize,

    /// Default per-statement timeout in seconds
    #[arg(long, env = "NEO4J_QUERY_TIMEOUT_SECS", default_value_t = 10)]
    query_timeout_secs: u64,

    /// Seconds to wait for a free execution slot (waits indefinitely if unset)
    #[arg(long, env = "NEO4J_ACQUIRE_TIMEOUT_SECS")]
    acquire_timeout_secs: Option<u64>,

    /// Give up on opening and verifying a connection after this many seconds
    #[arg(long, env = "NEO4J_CONNECT_TIMEOUT_SECS", default_value_t = 15)]
    connect_timeout_secs: u64,

    /// Maximum number of records returned per statement
    #[arg(long, env = "NEO4J_MAX_RECORDS", default_value_t = 1000)]
    max_records: usize,

    /// Environment file to load (defaults to ./.env when present)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn credentials(&self) -> PartialCredentials {
        PartialCredentials::new(
            self.neo4j_uri.clone(),
            self.neo4j_username.clone(),
            self.neo4j_password.clone(),
        )
    }

    fn executor_config(&self) -> Result<ExecutorConfig> {
        Ok(ExecutorConfig::builder()
            .max_concurrency(self.max_concurrency)
            .query_timeout(Duration::from_secs(self.query_timeout_secs))
            .acquire_timeout(self.acquire_timeout_secs.map(Duration::from_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .max_records(self.max_records)
            .build()?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let env_file = load_env_file(cli.env_file.as_deref())?;
    // Parse again so env fallbacks see values loaded from the .env file.
    let cli = Cli::parse();

    init_tracing(&cli.log_level);

    info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
    if let Some(path) = env_file {
        info!("Loaded environment from {}", path.display());
    }

    let config = ServerConfig::builder()
        .executor(cli.executor_config()?)
        .build();

    let connections = ConnectionManager::new(Arc::new(Neo4jConnector::new(
        config.executor.max_concurrency,
    )))
    .with_connect_timeout(config.executor.connect_timeout);

    // Runs alongside the server so requests are served while it connects.
    let resolution = CredentialResolver::new()
        .source(CredentialSource::CommandLine, cli.credentials())
        .source(CredentialSource::Environment, PartialCredentials::from_env())
        .resolve();
    {
        let connections = connections.clone();
        tokio::spawn(async move { eager_connect(&connections, resolution).await });
    }

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    let state = Arc::new(
        ServerStateBuilder::new()
            .config(config)
            .connection_manager(connections.clone())
            .shutdown_token(shutdown.clone())
            .build()?,
    );

    info!("Server state initialized with {} tools", state.tools.len());

    let server = McpServerBuilder::new()
        .handler(McpHandler::new(state))
        .name(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .shutdown_token(shutdown)
        .build()?;

    info!("MCP server ready, waiting for requests on stdin...");

    let result = server.run().await;
    if let Err(e) = &result {
        error!("Server error: {}", e);
    }

    let outcome = connections.disconnect().await;
    info!("{}", outcome.message());
    info!("Server shutdown complete");

    // The stdin reader may still be parked in a blocking read that would keep
    // the runtime alive.
    std::process::exit(if result.is_ok() { 0 } else { 1 });
}

fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = wait_for_signal() => {
                info!("Termination signal received, shutting down gracefully...");
                shutdown.cancel();
            }
        }
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            warn!("Could not register SIGTERM handler: {}", e);
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("neo4j_mcp_server={},warn", level)));

    // Use JSON format for structured logging to stderr (stdout is for MCP protocol)
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .json()
        .init();
}
