//! File API handlers
//!
//! HTTP endpoints for browsing and editing files inside an agent's
//! directory. Image and video files are passed through as raw bytes with a
//! matching Content-Type; everything else is served as decoded text in a
//! JSON envelope.

use crate::error::AppError;
use crate::services::classify;
use crate::services::files::{self, FileEntry};
use crate::services::workspace::AgentKind;
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

/// Query parameters accepted by the file read endpoints
#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    /// Optional root restriction: `agent-hub` or `examples`
    pub agent_type: Option<String>,
}

/// File listing response
#[derive(Debug, Serialize)]
pub struct ListFilesResponse {
    /// Always true on this path
    pub success: bool,
    /// Recursive listing relative to the agent directory
    pub files: Vec<FileEntry>,
}

/// Text file content response
#[derive(Debug, Serialize)]
pub struct FileContentResponse {
    /// Always true on this path
    pub success: bool,
    /// Decoded file content
    pub content: String,
    /// Classifier token (`text` for everything that is not image/video)
    #[serde(rename = "type")]
    pub file_type: &'static str,
}

/// Write/delete acknowledgement
#[derive(Debug, Serialize)]
pub struct FileOpResponse {
    /// Whether the operation succeeded
    pub success: bool,
    /// Human-readable message
    pub message: String,
}

/// Rename response
#[derive(Debug, Serialize)]
pub struct RenameResponse {
    /// Whether the operation succeeded
    pub success: bool,
    /// Human-readable message
    pub message: String,
    /// New path relative to the agent directory
    pub new_path: String,
}

/// Update file request
#[derive(Debug, Deserialize)]
pub struct UpdateFileRequest {
    /// Full replacement content (required)
    pub content: Option<String>,
}

/// Rename request
#[derive(Debug, Deserialize)]
pub struct RenameFileRequest {
    /// New leaf name (required)
    pub new_name: Option<String>,
}

/// GET /api/agents/:name/files - List an agent's files
pub async fn list_agent_files(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(query): Query<FileQuery>,
) -> Result<Json<ListFilesResponse>, AppError> {
    let hint = AgentKind::parse_type_hint(query.agent_type.as_deref())?;
    let agent = state.workspace.resolve(&name, hint)?;
    let files = files::list_entries(&agent.path)?;

    Ok(Json(ListFilesResponse {
        success: true,
        files,
    }))
}

/// GET /api/agents/:name/files/*path - Fetch file content
///
/// Serving strategy follows the classifier: image and video bytes are
/// returned as-is, anything else as decoded text in the JSON envelope.
pub async fn get_file_content(
    State(state): State<SharedState>,
    Path((name, file_path)): Path<(String, String)>,
    Query(query): Query<FileQuery>,
) -> Result<Response, AppError> {
    let hint = AgentKind::parse_type_hint(query.agent_type.as_deref())?;

    let kind = classify::classify(&file_path);
    if kind.serves_raw_bytes() {
        let bytes = state.files.read_binary(&name, &file_path, hint).await?;
        let content_type = classify::content_type(&file_path);
        return Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response());
    }

    let text = state.files.read_text(&name, &file_path, hint).await?;
    Ok(Json(FileContentResponse {
        success: true,
        content: text.content,
        file_type: text.kind.as_str(),
    })
    .into_response())
}

/// PUT /api/agents/:name/files/*path - Overwrite file content
pub async fn update_file_content(
    State(state): State<SharedState>,
    Path((name, file_path)): Path<(String, String)>,
    Json(request): Json<UpdateFileRequest>,
) -> Result<Json<FileOpResponse>, AppError> {
    let content = request
        .content
        .ok_or_else(|| AppError::Validation("Content is required".to_string()))?;

    state.files.write(&name, &file_path, &content).await?;
    Ok(Json(FileOpResponse {
        success: true,
        message: format!("Updated {file_path}"),
    }))
}

/// DELETE /api/agents/:name/files/*path - Delete a file or directory
pub async fn delete_file_or_folder(
    State(state): State<SharedState>,
    Path((name, file_path)): Path<(String, String)>,
) -> Result<Json<FileOpResponse>, AppError> {
    state.files.delete(&name, &file_path).await?;
    Ok(Json(FileOpResponse {
        success: true,
        message: format!("Deleted {file_path}"),
    }))
}

/// POST /api/agents/:name/files/*path/rename - Rename a leaf
///
/// The router cannot place a literal segment after a wildcard, so the
/// wildcard captures `<path>/rename` and the suffix is peeled off here; the
/// external surface is unchanged.
pub async fn rename_file_or_folder(
    State(state): State<SharedState>,
    Path((name, wildcard)): Path<(String, String)>,
    Json(request): Json<RenameFileRequest>,
) -> Result<Json<RenameResponse>, AppError> {
    let file_path = wildcard
        .strip_suffix("/rename")
        .ok_or_else(|| AppError::Validation(format!("Unsupported file action: {wildcard}")))?;
    let new_name = request
        .new_name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AppError::Validation("New name is required".to_string()))?;

    let renamed = state.files.rename(&name, file_path, &new_name).await?;
    Ok(Json(RenameResponse {
        success: true,
        message: format!("Renamed {file_path} to {new_name}"),
        new_path: renamed.new_path,
    }))
}
