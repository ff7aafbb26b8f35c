//! Application state
//!
//! Bundles the services the HTTP handlers dispatch to. Built once at startup
//! from the loaded configuration and shared behind an `Arc`; nothing here
//! mutates after construction — the filesystem is the source of truth, and
//! the runner guards its own process registry internally.

use crate::config::Config;
use crate::runner::AgentRunner;
use crate::services::{DataflowLocator, FileStore, Workspace};
use std::sync::Arc;

/// Shared application state handed to every handler
pub struct AppState {
    /// Loaded configuration
    pub config: Config,
    /// Agent-level operations over the two roots
    pub workspace: Workspace,
    /// File operations inside agent directories
    pub files: FileStore,
    /// Dataflow configuration discovery
    pub dataflow: DataflowLocator,
    /// Subprocess lifecycle management
    pub runner: AgentRunner,
}

/// Alias used in handler signatures
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Construct the state from the loaded configuration
    pub fn new(config: Config) -> Self {
        Self {
            workspace: Workspace::new(&config.workspace),
            files: FileStore::new(&config.workspace),
            dataflow: DataflowLocator::new(&config.workspace),
            runner: AgentRunner::new(&config),
            config,
        }
    }

    /// Convenience constructor returning the shared form
    pub fn shared(config: Config) -> SharedState {
        Arc::new(Self::new(config))
    }
}
