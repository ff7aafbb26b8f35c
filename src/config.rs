//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults. The configuration is built once at startup and
//! passed explicitly into every component constructor.

use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Agent workspace configuration (hub and examples roots)
    pub workspace: WorkspaceConfig,
    /// Execution configuration
    pub execution: ExecutionConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Agent workspace configuration
///
/// The two categorized roots agents live under. The hub root holds reusable
/// agent packages; the examples root holds demonstration dataflows.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Base directory for hub agents
    pub hub_dir: PathBuf,
    /// Base directory for example agents
    pub examples_dir: PathBuf,
}

/// Execution configuration
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Default number of seconds a run request waits before reporting the
    /// process as still running
    pub default_timeout_secs: u64,
    /// CLI used to run hub agents
    pub agent_command: String,
    /// CLI used to run example dataflows
    pub dataflow_command: String,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            workspace: WorkspaceConfig {
                hub_dir: env::var("HUB_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("agent-hub")),
                examples_dir: env::var("EXAMPLES_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("agent-examples")),
            },
            execution: ExecutionConfig {
                default_timeout_secs: env::var("RUN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(5),
                agent_command: env::var("AGENT_COMMAND").unwrap_or_else(|_| "mofa".to_string()),
                dataflow_command: env::var("DATAFLOW_COMMAND")
                    .unwrap_or_else(|_| "dora".to_string()),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
