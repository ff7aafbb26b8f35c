//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` and serialize to the common JSON envelope
//! (`success: false` plus a human-readable message).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::runner::ExecutionError;

/// Application-level error types
///
/// All errors that can occur in the application are represented by this enum.
/// Each variant implements automatic conversion to HTTP responses via `IntoResponse`.
#[derive(Error, Debug)]
pub enum AppError {
    /// A required request field is missing or carries an invalid value
    #[error("{0}")]
    Validation(String),

    /// A relative path is absolute, empty, or escapes the agent directory
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Agent with the given name was not found under any root
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// File or directory was not found under any root
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// The underlying rename call failed (e.g. target name collides)
    #[error("Rename failed: {0}")]
    RenameFailed(String),

    /// The underlying removal call failed (e.g. permissions)
    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    /// A filesystem operation other than delete/rename reported failure
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// Error occurred while running or managing an agent process
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            AppError::RenameFailed(_) => StatusCode::BAD_REQUEST,
            AppError::AgentNotFound(_) => StatusCode::NOT_FOUND,
            AppError::FileNotFound(_) => StatusCode::NOT_FOUND,
            // A poll or stop against an unregistered process is a missing
            // resource, not a failed execution.
            AppError::Execution(ExecutionError::ProcessNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::DeleteFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::OperationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Execution(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
