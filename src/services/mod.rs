//! Service layer
//!
//! Filesystem-backed business logic behind the HTTP handlers: agent
//! resolution across the hub and examples roots, file access inside agent
//! directories, file type classification, and dataflow discovery.

pub mod classify;
pub mod dataflow;
pub mod files;
pub mod workspace;

pub use classify::FileKind;
pub use dataflow::DataflowLocator;
pub use files::FileStore;
pub use workspace::{AgentKind, Workspace};
