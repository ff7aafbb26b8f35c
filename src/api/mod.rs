//! API module
//!
//! Contains HTTP request handlers for agent, file and dataflow endpoints

pub mod agents;
pub mod dataflow;
pub mod files;
