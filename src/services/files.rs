//! File access service
//!
//! Read, write, rename and delete files inside a resolved agent directory.
//! Every caller-supplied relative path is sanitized before any filesystem
//! access: absolute paths and parent-directory components are rejected
//! closed, so no operation can reach outside the owning agent's subtree.
//!
//! File-level root resolution is distinct from agent-level resolution: read,
//! delete and rename probe the candidate roots in priority order and commit
//! to the first root where the *file* exists, not just the agent directory.
//!
//! Concurrent requests against the same file are not coordinated: writes are
//! last-write-wins, and a delete or rename racing a read may surface a
//! not-found to the reader. Accepted limitation; the filesystem is never
//! locked or versioned by this layer.

use crate::config::WorkspaceConfig;
use crate::error::AppError;
use crate::services::classify::{self, FileKind};
use crate::services::workspace::{validate_agent_name, AgentKind, RootSet};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use walkdir::WalkDir;

/// A file or directory below an agent root
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileEntry {
    /// Path relative to the agent directory, forward-slash separated
    pub path: String,
    /// Whether the entry is a directory
    pub is_directory: bool,
}

/// Text file content together with its classification
#[derive(Debug)]
pub struct TextFile {
    /// Decoded file content
    pub content: String,
    /// Classifier kind (always `Text` on this path today; carried so the
    /// handler serializes the type token from one place)
    pub kind: FileKind,
}

/// Result of a leaf rename
#[derive(Debug)]
pub struct RenamedFile {
    /// New path relative to the agent directory
    pub new_path: String,
}

/// File access over the two agent roots
#[derive(Debug, Clone)]
pub struct FileStore {
    roots: RootSet,
}

/// Validate a caller-supplied relative path and normalize it to components
///
/// Rejects empty and absolute paths and any path containing a
/// parent-directory segment. `.` segments are dropped.
pub fn sanitize_rel_path(rel: &str) -> Result<PathBuf, AppError> {
    if rel.trim().is_empty() {
        return Err(AppError::InvalidPath("Path is required".to_string()));
    }

    let mut sanitized = PathBuf::new();
    for component in Path::new(rel).components() {
        match component {
            Component::Normal(part) => sanitized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(AppError::InvalidPath(format!(
                    "Path must not contain parent-directory segments: {rel}"
                )))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(AppError::InvalidPath(format!(
                    "Path must be relative: {rel}"
                )))
            }
        }
    }

    if sanitized.as_os_str().is_empty() {
        return Err(AppError::InvalidPath(format!("Path is empty: {rel}")));
    }
    Ok(sanitized)
}

/// Recursively list everything below `dir` as agent-relative entries
///
/// Paths are forward-slash separated and sorted for a deterministic listing.
pub fn list_entries(dir: &Path) -> Result<Vec<FileEntry>, AppError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry
            .map_err(|e| AppError::OperationFailed(format!("Failed to walk directory: {e}")))?;
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| AppError::OperationFailed(format!("Failed to relativize path: {e}")))?;
        let path = relative
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect::<Vec<_>>()
            .join("/");
        entries.push(FileEntry {
            path,
            is_directory: entry.file_type().is_dir(),
        });
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

impl FileStore {
    /// Create a file store over the configured roots
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self {
            roots: RootSet::new(config),
        }
    }

    /// Locate `agent/rel` under the first root where the file itself exists
    ///
    /// A hint restricts the probe to that root; without one the roots are
    /// tried in priority order.
    fn locate(
        &self,
        agent: &str,
        rel: &str,
        hint: Option<AgentKind>,
    ) -> Result<PathBuf, AppError> {
        validate_agent_name(agent)?;
        let rel = sanitize_rel_path(rel)?;

        let found = match hint {
            Some(kind) => {
                let path = self.roots.root_of(kind).join(agent).join(&rel);
                path.exists().then_some(path)
            }
            None => self
                .roots
                .find_first_existing(&Path::new(agent).join(&rel))
                .map(|(_, path)| path),
        };

        found.ok_or_else(|| AppError::FileNotFound(format!("{agent}/{}", rel.display())))
    }

    /// Read raw bytes of a file, for image/video passthrough
    pub async fn read_binary(
        &self,
        agent: &str,
        rel: &str,
        hint: Option<AgentKind>,
    ) -> Result<Vec<u8>, AppError> {
        let path = self.locate(agent, rel, hint)?;
        if !path.is_file() {
            return Err(AppError::FileNotFound(format!("{agent}/{rel}")));
        }
        fs::read(&path)
            .await
            .map_err(|e| map_read_error(e, agent, rel))
    }

    /// Read a file as UTF-8 text together with its classification
    pub async fn read_text(
        &self,
        agent: &str,
        rel: &str,
        hint: Option<AgentKind>,
    ) -> Result<TextFile, AppError> {
        let path = self.locate(agent, rel, hint)?;
        if !path.is_file() {
            return Err(AppError::FileNotFound(format!("{agent}/{rel}")));
        }
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| map_read_error(e, agent, rel))?;
        Ok(TextFile {
            content,
            kind: classify::classify(rel),
        })
    }

    /// Overwrite a file's content, creating it (and missing parent
    /// directories) inside an already-existing agent directory
    pub async fn write(&self, agent: &str, rel: &str, content: &str) -> Result<(), AppError> {
        validate_agent_name(agent)?;
        let rel = sanitize_rel_path(rel)?;

        // The agent directory must exist; files are never created for
        // agents that do not.
        let (_, agent_dir) = self
            .roots
            .find_first_existing(Path::new(agent))
            .filter(|(_, path)| path.is_dir())
            .ok_or_else(|| AppError::AgentNotFound(agent.to_string()))?;

        let path = agent_dir.join(&rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::OperationFailed(format!("Failed to create parent directories: {e}"))
            })?;
        }

        fs::write(&path, content)
            .await
            .map_err(|e| AppError::OperationFailed(format!("Failed to write file: {e}")))?;

        debug!(agent = %agent, path = %rel.display(), bytes = content.len(), "Wrote file");
        Ok(())
    }

    /// Delete a file, or a directory recursively
    pub async fn delete(&self, agent: &str, rel: &str) -> Result<(), AppError> {
        let path = self.locate(agent, rel, None)?;

        let result = if path.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };
        result.map_err(|e| AppError::DeleteFailed(format!("Failed to delete {agent}/{rel}: {e}")))?;

        info!(agent = %agent, path = %rel, "Deleted file or directory");
        Ok(())
    }

    /// Rename the leaf of `rel` to `new_name`, preserving the parent sub-path
    pub async fn rename(
        &self,
        agent: &str,
        rel: &str,
        new_name: &str,
    ) -> Result<RenamedFile, AppError> {
        if new_name.trim().is_empty() {
            return Err(AppError::Validation("New name is required".to_string()));
        }
        if new_name == "." || new_name == ".." || new_name.contains('/') || new_name.contains('\\')
        {
            return Err(AppError::InvalidPath(format!(
                "New name must be a single path segment: {new_name}"
            )));
        }

        let old_path = self.locate(agent, rel, None)?;
        let new_path = old_path
            .parent()
            .map(|parent| parent.join(new_name))
            .ok_or_else(|| AppError::InvalidPath(format!("Path has no parent: {rel}")))?;

        if new_path.exists() {
            return Err(AppError::RenameFailed(format!(
                "Target '{new_name}' already exists"
            )));
        }

        fs::rename(&old_path, &new_path)
            .await
            .map_err(|e| AppError::RenameFailed(format!("Failed to rename {agent}/{rel}: {e}")))?;

        // Swap the leaf of the sanitized relative path.
        let mut new_rel = sanitize_rel_path(rel)?;
        new_rel.set_file_name(new_name);
        let new_rel = new_rel
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect::<Vec<_>>()
            .join("/");

        info!(agent = %agent, from = %rel, to = %new_rel, "Renamed file or directory");
        Ok(RenamedFile { new_path: new_rel })
    }
}

fn map_read_error(error: std::io::Error, agent: &str, rel: &str) -> AppError {
    match error.kind() {
        ErrorKind::NotFound => AppError::FileNotFound(format!("{agent}/{rel}")),
        ErrorKind::InvalidData => AppError::OperationFailed(format!(
            "File {agent}/{rel} is not valid UTF-8 text"
        )),
        _ => AppError::OperationFailed(format!("Failed to read {agent}/{rel}: {error}")),
    }
}
