//! Execution-specific error types
//!
//! Errors that can occur while spawning or managing agent processes.

use thiserror::Error;

/// Errors that can occur during agent execution
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// Process lifecycle call (kill, wait) reported failure
    #[error("Process execution failed: {0}")]
    ProcessFailed(String),

    /// Failed to spawn the process (e.g., command not found, permission denied)
    #[error("Failed to spawn process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    /// No registered process matches the given id or agent name
    #[error("Process not found: {0}")]
    ProcessNotFound(String),
}
