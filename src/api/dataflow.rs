//! Dataflow API handlers
//!
//! Exposes the convention-based dataflow file lookup for examples.

use crate::error::AppError;
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;

/// Dataflow lookup response
#[derive(Debug, Serialize)]
pub struct DataflowFileResponse {
    /// Always true on this path
    pub success: bool,
    /// First match in directory-listing order; what a run would use
    pub dataflow_file: String,
    /// Directory the search ran over
    pub agent_path: String,
    /// All matches found, for caller inspection
    pub all_dataflow_files: Vec<String>,
}

/// GET /api/agents/:name/dataflow-file - Locate the dataflow configuration
pub async fn get_dataflow_file(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<DataflowFileResponse>, AppError> {
    let descriptor = state.dataflow.locate(&name)?;
    Ok(Json(DataflowFileResponse {
        success: true,
        dataflow_file: descriptor.primary,
        agent_path: descriptor.agent_path.to_string_lossy().to_string(),
        all_dataflow_files: descriptor.candidates,
    }))
}
