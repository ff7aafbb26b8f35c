//! Agent workspace service
//!
//! Resolves agents by name across the two categorized roots (hub and
//! examples) and provides the agent-level operations: inventory, details,
//! create, copy and delete. The filesystem is the single source of truth;
//! every operation re-resolves paths, nothing is cached between requests.

use crate::config::WorkspaceConfig;
use crate::error::AppError;
use crate::services::files::{self, FileEntry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Name of the manifest file written into every scaffolded agent directory
pub const MANIFEST_FILE: &str = "agent.yml";

/// Which categorized root an agent belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    /// Reusable agent package stored under the hub root
    #[serde(rename = "agent-hub")]
    Hub,
    /// Demonstration dataflow stored under the examples root
    #[serde(rename = "examples")]
    Example,
}

impl AgentKind {
    /// Resolution priority: hub before examples. When both roots claim a
    /// name, the first kind listed here wins.
    pub const PRIORITY: [AgentKind; 2] = [AgentKind::Hub, AgentKind::Example];

    /// Parse an optional `agent_type` request token (`agent-hub` / `examples`).
    ///
    /// `None` means the caller wants auto-detection. Any other token is a
    /// caller error, not a missing resource.
    pub fn parse_type_hint(token: Option<&str>) -> Result<Option<AgentKind>, AppError> {
        match token {
            None => Ok(None),
            Some("agent-hub") => Ok(Some(AgentKind::Hub)),
            Some("examples") => Ok(Some(AgentKind::Example)),
            Some(other) => Err(AppError::Validation(format!(
                "Invalid agent_type '{other}'. Must be 'agent-hub' or 'examples'"
            ))),
        }
    }

    /// Parse the run endpoint's `agent_type` token (`atomic` / `example` /
    /// `auto`). `None` and `auto` both mean auto-detection.
    pub fn parse_run_hint(token: Option<&str>) -> Result<Option<AgentKind>, AppError> {
        match token {
            None | Some("auto") => Ok(None),
            Some("atomic") => Ok(Some(AgentKind::Hub)),
            Some("example") => Ok(Some(AgentKind::Example)),
            Some(other) => Err(AppError::Validation(format!(
                "Invalid agent_type '{other}'. Must be 'atomic', 'example', or 'auto'"
            ))),
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentKind::Hub => write!(f, "agent-hub"),
            AgentKind::Example => write!(f, "examples"),
        }
    }
}

/// The ordered set of candidate base directories
///
/// All multi-root probing in the application goes through
/// [`RootSet::find_first_existing`], so the priority logic lives in exactly
/// one place.
#[derive(Debug, Clone)]
pub struct RootSet {
    hub_dir: PathBuf,
    examples_dir: PathBuf,
}

impl RootSet {
    /// Build a root set from the workspace configuration
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self {
            hub_dir: config.hub_dir.clone(),
            examples_dir: config.examples_dir.clone(),
        }
    }

    /// Base directory for the given kind
    pub fn root_of(&self, kind: AgentKind) -> &Path {
        match kind {
            AgentKind::Hub => &self.hub_dir,
            AgentKind::Example => &self.examples_dir,
        }
    }

    /// Probe the roots in priority order and return the first one under
    /// which `relative` exists, together with the full path.
    pub fn find_first_existing(&self, relative: &Path) -> Option<(AgentKind, PathBuf)> {
        for kind in AgentKind::PRIORITY {
            let candidate = self.root_of(kind).join(relative);
            if candidate.exists() {
                return Some((kind, candidate));
            }
        }
        None
    }
}

/// An agent located under a specific root
#[derive(Debug, Clone)]
pub struct ResolvedAgent {
    /// Agent name (single path segment)
    pub name: String,
    /// Root the agent was found under
    pub kind: AgentKind,
    /// Full path of the agent directory
    pub path: PathBuf,
}

/// Manifest written by `create` and surfaced in agent details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentManifest {
    /// Agent name
    pub name: String,
    /// Agent version
    pub version: String,
    /// Agent authors
    pub authors: String,
}

/// Agent names grouped by root
#[derive(Debug, Serialize)]
pub struct AgentInventory {
    /// Names under the hub root, sorted
    pub hub_agents: Vec<String>,
    /// Names under the examples root, sorted
    pub example_agents: Vec<String>,
}

/// Detailed view of a single agent
#[derive(Debug, Serialize)]
pub struct AgentDetails {
    /// Agent name
    pub name: String,
    /// Root the agent was found under
    pub agent_type: AgentKind,
    /// Full path of the agent directory
    pub path: String,
    /// Manifest contents, when the directory carries one
    pub manifest: Option<AgentManifest>,
    /// Recursive file listing
    pub files: Vec<FileEntry>,
}

/// Agent workspace service over the two roots
#[derive(Debug, Clone)]
pub struct Workspace {
    roots: RootSet,
}

/// Reject agent names that are empty or not a single path segment
pub fn validate_agent_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Agent name is required".to_string()));
    }
    if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(AppError::InvalidPath(format!(
            "Agent name must be a single path segment: {name}"
        )));
    }
    Ok(())
}

impl Workspace {
    /// Create a workspace service over the configured roots
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self {
            roots: RootSet::new(config),
        }
    }

    /// The underlying root set
    pub fn roots(&self) -> &RootSet {
        &self.roots
    }

    /// Locate an agent directory by name
    ///
    /// With a hint, only that root is probed. Without one, roots are probed
    /// in priority order (hub first) and the first existing directory wins.
    pub fn resolve(&self, name: &str, hint: Option<AgentKind>) -> Result<ResolvedAgent, AppError> {
        validate_agent_name(name)?;

        let found = match hint {
            Some(kind) => {
                let path = self.roots.root_of(kind).join(name);
                path.is_dir().then_some((kind, path))
            }
            None => self
                .roots
                .find_first_existing(Path::new(name))
                .filter(|(_, path)| path.is_dir()),
        };

        found
            .map(|(kind, path)| ResolvedAgent {
                name: name.to_string(),
                kind,
                path,
            })
            .ok_or_else(|| AppError::AgentNotFound(name.to_string()))
    }

    /// List agent names grouped by root, each group sorted by name
    pub async fn list(&self) -> Result<AgentInventory, AppError> {
        Ok(AgentInventory {
            hub_agents: self.list_root(AgentKind::Hub).await?,
            example_agents: self.list_root(AgentKind::Example).await?,
        })
    }

    async fn list_root(&self, kind: AgentKind) -> Result<Vec<String>, AppError> {
        let root = self.roots.root_of(kind);
        if !root.is_dir() {
            // A missing root is an empty category, not an error.
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(root).await.map_err(|e| {
            AppError::OperationFailed(format!("Failed to read {kind} root: {e}"))
        })?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            AppError::OperationFailed(format!("Failed to read {kind} root entry: {e}"))
        })? {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Full detail view of an agent: kind, path, manifest, recursive files
    pub async fn details(
        &self,
        name: &str,
        hint: Option<AgentKind>,
    ) -> Result<AgentDetails, AppError> {
        let agent = self.resolve(name, hint)?;
        let manifest = self.read_manifest(&agent.path).await;
        let files = files::list_entries(&agent.path)?;

        Ok(AgentDetails {
            name: agent.name,
            agent_type: agent.kind,
            path: agent.path.to_string_lossy().to_string(),
            manifest,
            files,
        })
    }

    async fn read_manifest(&self, agent_dir: &Path) -> Option<AgentManifest> {
        let manifest_path = agent_dir.join(MANIFEST_FILE);
        let raw = fs::read_to_string(&manifest_path).await.ok()?;
        match serde_yaml::from_str(&raw) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!(path = %manifest_path.display(), error = %e, "Unreadable agent manifest");
                None
            }
        }
    }

    /// Scaffold a new agent directory under the given root
    ///
    /// A name may be claimed by at most one root, so creation is rejected if
    /// the name already exists under either of them.
    pub async fn create(
        &self,
        name: &str,
        version: &str,
        authors: &str,
        kind: AgentKind,
    ) -> Result<(), AppError> {
        validate_agent_name(name)?;

        if let Some((owner, _)) = self.roots.find_first_existing(Path::new(name)) {
            return Err(AppError::Validation(format!(
                "Agent '{name}' already exists under {owner}"
            )));
        }

        let agent_dir = self.roots.root_of(kind).join(name);
        fs::create_dir_all(&agent_dir).await.map_err(|e| {
            AppError::OperationFailed(format!("Failed to create agent directory: {e}"))
        })?;

        let manifest = AgentManifest {
            name: name.to_string(),
            version: version.to_string(),
            authors: authors.to_string(),
        };
        let manifest_yaml = serde_yaml::to_string(&manifest)
            .map_err(|e| AppError::OperationFailed(format!("Failed to encode manifest: {e}")))?;
        fs::write(agent_dir.join(MANIFEST_FILE), manifest_yaml)
            .await
            .map_err(|e| AppError::OperationFailed(format!("Failed to write manifest: {e}")))?;

        fs::write(
            agent_dir.join("README.md"),
            format!("# {name}\n\nCreated with agent-stage-backend.\n"),
        )
        .await
        .map_err(|e| AppError::OperationFailed(format!("Failed to write README: {e}")))?;

        // Examples are located by dataflow-file convention; give new ones a
        // stub so they are immediately resolvable.
        if kind == AgentKind::Example {
            fs::write(agent_dir.join(format!("{name}_dataflow.yml")), "nodes: []\n")
                .await
                .map_err(|e| {
                    AppError::OperationFailed(format!("Failed to write dataflow stub: {e}"))
                })?;
        }

        info!(agent = %name, kind = %kind, "Created agent");
        Ok(())
    }

    /// Copy an existing agent into a new directory under the source's root
    pub async fn copy(
        &self,
        source: &str,
        target: &str,
        hint: Option<AgentKind>,
    ) -> Result<AgentKind, AppError> {
        validate_agent_name(target)?;
        let source_agent = self.resolve(source, hint)?;

        if self.roots.find_first_existing(Path::new(target)).is_some() {
            return Err(AppError::Validation(format!(
                "Agent '{target}' already exists"
            )));
        }

        let target_dir = self.roots.root_of(source_agent.kind).join(target);
        let source_dir = source_agent.path.clone();
        debug!(
            source = %source_dir.display(),
            target = %target_dir.display(),
            "Copying agent directory"
        );

        tokio::task::spawn_blocking(move || copy_dir_recursive(&source_dir, &target_dir))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Copy task panicked: {e}")))?
            .map_err(|e| AppError::OperationFailed(format!("Failed to copy agent: {e}")))?;

        info!(source = %source, target = %target, kind = %source_agent.kind, "Copied agent");
        Ok(source_agent.kind)
    }

    /// Delete an agent directory, resolving the owning root automatically
    pub async fn delete(&self, name: &str) -> Result<AgentKind, AppError> {
        let agent = self.resolve(name, None)?;
        fs::remove_dir_all(&agent.path)
            .await
            .map_err(|e| AppError::DeleteFailed(format!("Failed to delete agent: {e}")))?;

        info!(agent = %name, kind = %agent.kind, "Deleted agent");
        Ok(agent.kind)
    }
}

/// Recursively copy a directory tree
fn copy_dir_recursive(source: &Path, target: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(target)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let dest = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}
