//! Agent execution module
//!
//! Spawns agent processes, captures their output, and tracks them in a
//! registry for polling and termination.

pub mod error;
pub mod process;

pub use error::ExecutionError;
pub use process::{AgentRunner, ProcessId, RunReport};
