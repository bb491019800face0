//! Startup credential resolution.
//!
//! Sources are consulted in priority order (command line, then environment).
//! Each field of the final configuration comes from the highest-priority source
//! that provides it, but an eager connect is only attempted when a single
//! source supplies the complete `uri`/`username`/`password` triple.

use crate::config::{ConnectionConfig, CredentialSource};
use crate::database::uri::sanitize_uri;
use crate::error::{ConfigError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ENV_URI: &str = "NEO4J_URI";
pub const ENV_USERNAME: &str = "NEO4J_USERNAME";
pub const ENV_PASSWORD: &str = "NEO4J_PASSWORD";

/// Possibly incomplete connection settings from one source.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PartialCredentials {
    pub uri: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl PartialCredentials {
    /// Empty or whitespace-only values count as absent.
    pub fn new(uri: Option<String>, username: Option<String>, password: Option<String>) -> Self {
        Self {
            uri: non_empty(uri),
            username: non_empty(username),
            password: non_empty(password),
        }
    }

    /// Reads `NEO4J_URI`, `NEO4J_USERNAME` and `NEO4J_PASSWORD`.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var(ENV_URI).ok(),
            std::env::var(ENV_USERNAME).ok(),
            std::env::var(ENV_PASSWORD).ok(),
        )
    }

    pub fn is_complete(&self) -> bool {
        self.uri.is_some() && self.username.is_some() && self.password.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.uri.is_none() && self.username.is_none() && self.password.is_none()
    }

    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.uri.is_none() {
            missing.push("uri");
        }
        if self.username.is_none() {
            missing.push("username");
        }
        if self.password.is_none() {
            missing.push("password");
        }
        missing
    }

    /// Fills absent fields from `lower` without overriding present ones.
    fn fill_from(&mut self, lower: &PartialCredentials) {
        if self.uri.is_none() {
            self.uri.clone_from(&lower.uri);
        }
        if self.username.is_none() {
            self.username.clone_from(&lower.username);
        }
        if self.password.is_none() {
            self.password.clone_from(&lower.password);
        }
    }
}

impl fmt::Debug for PartialCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialCredentials")
            .field("uri", &self.uri.as_deref().map(sanitize_uri))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Outcome of credential resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Source of the complete triple, else the highest-priority source that contributed anything.
    pub source: Option<CredentialSource>,
    /// True iff a single source supplied every field.
    pub complete: bool,
    /// Whether startup should attempt exactly one connect.
    pub eager_connect: bool,
    /// Merged configuration, present only when every field could be filled.
    pub config: Option<ConnectionConfig>,
    /// Fields still missing after merging all sources.
    pub missing: Vec<&'static str>,
}

/// Prioritized credential resolver.
#[derive(Debug, Default)]
pub struct CredentialResolver {
    sources: Vec<(CredentialSource, PartialCredentials)>,
}

impl CredentialResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source with lower priority than every source added before it.
    pub fn source(mut self, source: CredentialSource, credentials: PartialCredentials) -> Self {
        self.sources.push((source, credentials));
        self
    }

    pub fn resolve(&self) -> Resolution {
        let complete_source = self
            .sources
            .iter()
            .find(|(_, creds)| creds.is_complete())
            .map(|(source, _)| *source);

        let mut merged = PartialCredentials::default();
        for (_, creds) in &self.sources {
            merged.fill_from(creds);
        }

        let source = complete_source.or_else(|| {
            self.sources
                .iter()
                .find(|(_, creds)| !creds.is_empty())
                .map(|(source, _)| *source)
        });

        let missing = merged.missing();
        let config = match (merged.uri, merged.username, merged.password) {
            (Some(uri), Some(username), Some(password)) => Some(ConnectionConfig::new(
                uri,
                username,
                password,
                source.unwrap_or(CredentialSource::Manual),
            )),
            _ => None,
        };

        match (complete_source, &config) {
            (Some(source), Some(config)) => info!(
                source = %source,
                uri = %config.sanitized_uri(),
                "Resolved complete Neo4j credentials"
            ),
            (None, Some(_)) => info!(
                "Neo4j settings are only complete when sources are combined; waiting for manual connect"
            ),
            _ => info!(
                missing = ?missing,
                "Neo4j connection parameters not fully provided; awaiting manual connect"
            ),
        }

        Resolution {
            source,
            complete: complete_source.is_some(),
            eager_connect: complete_source.is_some() && config.is_some(),
            config,
            missing,
        }
    }
}

/// Loads a `.env` file, overriding variables already present in the process
/// environment.
///
/// With no explicit path, a missing default `.env` is not an error.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>> {
    let loaded = match path {
        Some(path) => dotenvy::from_path_override(path)
            .map(|()| path.to_path_buf())
            .map_err(|e| ConfigError::EnvFile {
                path: path.display().to_string(),
                message: e.to_string(),
            })?,
        None => match dotenvy::dotenv_override() {
            Ok(path) => path,
            Err(e) if e.not_found() => {
                debug!("No .env file found");
                return Ok(None);
            }
            Err(e) => {
                return Err(ConfigError::EnvFile {
                    path: ".env".into(),
                    message: e.to_string(),
                }
                .into());
            }
        },
    };

    info!("Loaded environment overrides from {}", loaded.display());
    Ok(Some(loaded))
}
