//! Agent management API handlers
//!
//! HTTP request handlers for agent CRUD operations and subprocess runs.
//! Every success body carries `success: true`; failures are converted by
//! `AppError` into the matching envelope and status code.

use crate::error::AppError;
use crate::services::workspace::{AgentDetails, AgentKind};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

/// Default version stamped into created agents
const DEFAULT_VERSION: &str = "0.0.1";
/// Default authors stamped into created agents
const DEFAULT_AUTHORS: &str = "Agent Stage User";

/// Agents list response, grouped by root
#[derive(Debug, Serialize)]
pub struct ListAgentsResponse {
    /// Always true on this path
    pub success: bool,
    /// Hub agent names, sorted
    pub hub_agents: Vec<String>,
    /// Example agent names, sorted
    pub example_agents: Vec<String>,
}

/// Agent detail response
#[derive(Debug, Serialize)]
pub struct AgentDetailResponse {
    /// Always true on this path
    pub success: bool,
    /// Resolved agent details
    pub agent: AgentDetails,
}

/// Generic message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Whether the operation succeeded
    pub success: bool,
    /// Human-readable message
    pub message: String,
}

/// Create agent request
#[derive(Debug, Deserialize)]
pub struct CreateAgentRequest {
    /// Name for the new agent (required)
    pub name: Option<String>,
    /// Version recorded in the manifest
    pub version: Option<String>,
    /// Authors recorded in the manifest
    pub authors: Option<String>,
    /// Target root: `agent-hub` (default) or `examples`
    pub agent_type: Option<String>,
}

/// Copy agent request
#[derive(Debug, Deserialize)]
pub struct CopyAgentRequest {
    /// Source agent name (required)
    pub source: Option<String>,
    /// Target agent name (required)
    pub target: Option<String>,
    /// Root of the source; auto-detected when absent
    pub agent_type: Option<String>,
}

/// Run agent request
#[derive(Debug, Default, Deserialize)]
pub struct RunAgentRequest {
    /// Seconds to wait for the process before answering
    pub timeout: Option<u64>,
    /// `atomic`, `example`, or `auto` (default)
    pub agent_type: Option<String>,
}

/// Run / process-output response
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    /// Always true on this path
    pub success: bool,
    /// Registry id of the process
    pub process_id: String,
    /// Agent the process belongs to
    pub agent: String,
    /// Output captured so far
    pub output: String,
    /// Whether the process is still running
    pub running: bool,
}

/// Logs response; this endpoint never 404s
#[derive(Debug, Serialize)]
pub struct LogsResponse {
    /// Always true on this path
    pub success: bool,
    /// Log content, or a placeholder when the agent has not run yet
    pub logs: String,
}

impl From<crate::runner::RunReport> for ProcessResponse {
    fn from(report: crate::runner::RunReport) -> Self {
        Self {
            success: true,
            process_id: report.process_id,
            agent: report.agent,
            output: report.output,
            running: report.running,
        }
    }
}

/// GET /api/agents - List agents grouped by root
pub async fn list_agents(
    State(state): State<SharedState>,
) -> Result<Json<ListAgentsResponse>, AppError> {
    let inventory = state.workspace.list().await?;
    Ok(Json(ListAgentsResponse {
        success: true,
        hub_agents: inventory.hub_agents,
        example_agents: inventory.example_agents,
    }))
}

/// GET /api/agents/:name - Agent details including file listing
pub async fn get_agent(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<AgentDetailResponse>, AppError> {
    let agent = state.workspace.details(&name, None).await?;
    Ok(Json(AgentDetailResponse {
        success: true,
        agent,
    }))
}

/// POST /api/agents - Create a new agent
pub async fn create_agent(
    State(state): State<SharedState>,
    Json(request): Json<CreateAgentRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let name = request
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Agent name is required".to_string()))?;
    let kind = AgentKind::parse_type_hint(request.agent_type.as_deref())?.unwrap_or(AgentKind::Hub);

    let version = request.version.unwrap_or_else(|| DEFAULT_VERSION.to_string());
    let authors = request.authors.unwrap_or_else(|| DEFAULT_AUTHORS.to_string());

    state.workspace.create(&name, &version, &authors, kind).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: format!("Agent '{name}' created under {kind}"),
    }))
}

/// POST /api/agents/copy - Copy an existing agent
pub async fn copy_agent(
    State(state): State<SharedState>,
    Json(request): Json<CopyAgentRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let (source, target) = match (request.source, request.target) {
        (Some(source), Some(target)) if !source.trim().is_empty() && !target.trim().is_empty() => {
            (source, target)
        }
        _ => {
            return Err(AppError::Validation(
                "Source and target agent names are required".to_string(),
            ))
        }
    };
    let hint = AgentKind::parse_type_hint(request.agent_type.as_deref())?;

    let kind = state.workspace.copy(&source, &target, hint).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: format!("Copied '{source}' to '{target}' under {kind}"),
    }))
}

/// DELETE /api/agents/:name - Delete an agent
pub async fn delete_agent(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let kind = state.workspace.delete(&name).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: format!("Deleted '{name}' from {kind}"),
    }))
}

/// POST /api/agents/:name/run - Run an agent or example
///
/// With an explicit `agent_type` the run is dispatched directly; otherwise
/// the hub directory is probed first, then examples.
pub async fn run_agent(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    request: Option<Json<RunAgentRequest>>,
) -> Result<Json<ProcessResponse>, AppError> {
    let request = request.map(|Json(request)| request).unwrap_or_default();
    let hint = AgentKind::parse_run_hint(request.agent_type.as_deref())?;
    let timeout = request
        .timeout
        .unwrap_or_else(|| state.runner.default_timeout_secs());

    let kind = match hint {
        Some(kind) => kind,
        None => {
            let roots = state.workspace.roots();
            if roots.root_of(AgentKind::Hub).join(&name).is_dir() {
                AgentKind::Hub
            } else if roots.root_of(AgentKind::Example).join(&name).is_dir() {
                AgentKind::Example
            } else {
                return Err(AppError::AgentNotFound(format!(
                    "Agent or example '{name}' not found in either agent-hub or examples directory"
                )));
            }
        }
    };

    let report = match kind {
        AgentKind::Hub => state.runner.start_agent(&name, timeout).await?,
        AgentKind::Example => state.runner.start_example(&name, timeout).await?,
    };
    Ok(Json(report.into()))
}

/// GET /api/agents/:name/logs - Fetch run logs
///
/// Never 404s: a missing log file is an expected state ("agent never run"),
/// answered with a placeholder instead of an error.
pub async fn get_agent_logs(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<LogsResponse>, AppError> {
    let logs = state.runner.logs(&name)?.unwrap_or_else(|| {
        format!("No log file found for {name}. The agent may not have been run yet.")
    });
    Ok(Json(LogsResponse {
        success: true,
        logs,
    }))
}

/// GET /api/agents/:name/process-output - Poll a running process
pub async fn get_process_output(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<ProcessResponse>, AppError> {
    let report = state.runner.output(&name).await?;
    Ok(Json(report.into()))
}

/// POST /api/agents/stop/:process_id - Terminate a running process
pub async fn stop_agent(
    State(state): State<SharedState>,
    Path(process_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let report = state.runner.stop(&process_id).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: format!("Stopped process {} for '{}'", report.process_id, report.agent),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ExecutionConfig, ServerConfig, WorkspaceConfig};
    use crate::state::AppState;
    use tempfile::{tempdir, TempDir};

    fn test_state() -> (TempDir, SharedState) {
        let temp = tempdir().expect("Failed to create temp dir");
        let config = Config {
            server: ServerConfig {
                port: 0,
                host: "127.0.0.1".to_string(),
            },
            workspace: WorkspaceConfig {
                hub_dir: temp.path().join("hub"),
                examples_dir: temp.path().join("examples"),
            },
            execution: ExecutionConfig {
                default_timeout_secs: 2,
                agent_command: "echo".to_string(),
                dataflow_command: "echo".to_string(),
            },
        };
        std::fs::create_dir_all(&config.workspace.hub_dir).unwrap();
        std::fs::create_dir_all(&config.workspace.examples_dir).unwrap();
        (temp, AppState::shared(config))
    }

    fn add_agent(state: &SharedState, kind: AgentKind, name: &str) {
        std::fs::create_dir_all(state.workspace.roots().root_of(kind).join(name)).unwrap();
    }

    #[tokio::test]
    async fn test_list_agents_empty() {
        let (_temp, state) = test_state();
        let response = list_agents(State(state)).await.unwrap();
        assert!(response.success);
        assert!(response.hub_agents.is_empty());
        assert!(response.example_agents.is_empty());
    }

    #[tokio::test]
    async fn test_create_then_list_and_detail() {
        let (_temp, state) = test_state();

        let request = CreateAgentRequest {
            name: Some("fresh".to_string()),
            version: None,
            authors: None,
            agent_type: None,
        };
        let response = create_agent(State(state.clone()), Json(request))
            .await
            .unwrap();
        assert!(response.success);

        let list = list_agents(State(state.clone())).await.unwrap();
        assert_eq!(list.hub_agents, vec!["fresh"]);

        let detail = get_agent(State(state), Path("fresh".to_string()))
            .await
            .unwrap();
        assert_eq!(detail.agent.agent_type, AgentKind::Hub);
        let manifest = detail.agent.manifest.as_ref().expect("manifest");
        assert_eq!(manifest.version, "0.0.1");
        assert!(detail.agent.files.iter().any(|f| f.path == "agent.yml"));
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let (_temp, state) = test_state();
        let request = CreateAgentRequest {
            name: None,
            version: None,
            authors: None,
            agent_type: None,
        };
        let result = create_agent(State(state), Json(request)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_agent_type() {
        let (_temp, state) = test_state();
        let request = CreateAgentRequest {
            name: Some("x".to_string()),
            version: None,
            authors: None,
            agent_type: Some("atomic".to_string()),
        };
        let result = create_agent(State(state), Json(request)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_copy_requires_both_names() {
        let (_temp, state) = test_state();
        let request = CopyAgentRequest {
            source: Some("a".to_string()),
            target: None,
            agent_type: None,
        };
        let result = copy_agent(State(state), Json(request)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_copy_and_delete() {
        let (_temp, state) = test_state();
        add_agent(&state, AgentKind::Example, "source");

        let request = CopyAgentRequest {
            source: Some("source".to_string()),
            target: Some("clone".to_string()),
            agent_type: None,
        };
        let response = copy_agent(State(state.clone()), Json(request))
            .await
            .unwrap();
        assert!(response.message.contains("examples"));

        let response = delete_agent(State(state.clone()), Path("clone".to_string()))
            .await
            .unwrap();
        assert!(response.success);

        let result = get_agent(State(state), Path("clone".to_string())).await;
        assert!(matches!(result, Err(AppError::AgentNotFound(_))));
    }

    #[tokio::test]
    async fn test_run_auto_detect_prefers_hub() {
        let (_temp, state) = test_state();
        add_agent(&state, AgentKind::Hub, "worker");

        let response = run_agent(State(state), Path("worker".to_string()), None)
            .await
            .unwrap();
        assert!(response.success);
        // Dispatched as an atomic agent run, not an example run.
        assert!(response.output.contains("run --agent-name worker"));
        assert!(!response.running);
    }

    #[tokio::test]
    async fn test_run_example_via_dataflow() {
        let (_temp, state) = test_state();
        add_agent(&state, AgentKind::Example, "demo");
        std::fs::write(
            state
                .workspace
                .roots()
                .root_of(AgentKind::Example)
                .join("demo/demo_dataflow.yml"),
            "nodes: []\n",
        )
        .unwrap();

        let response = run_agent(State(state), Path("demo".to_string()), None)
            .await
            .unwrap();
        assert!(response.output.contains("start demo_dataflow.yml"));
    }

    #[tokio::test]
    async fn test_run_unknown_agent() {
        let (_temp, state) = test_state();
        let result = run_agent(State(state), Path("ghost".to_string()), None).await;
        assert!(matches!(result, Err(AppError::AgentNotFound(_))));
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_agent_type() {
        let (_temp, state) = test_state();
        add_agent(&state, AgentKind::Hub, "worker");

        let request = RunAgentRequest {
            timeout: None,
            agent_type: Some("agent-hub".to_string()),
        };
        let result = run_agent(State(state), Path("worker".to_string()), Some(Json(request))).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_logs_placeholder_when_absent() {
        let (_temp, state) = test_state();
        add_agent(&state, AgentKind::Hub, "quiet");

        let response = get_agent_logs(State(state), Path("quiet".to_string()))
            .await
            .unwrap();
        assert!(response.success);
        assert!(response.logs.contains("No log file found for quiet"));
    }

    #[tokio::test]
    async fn test_process_output_after_run() {
        let (_temp, state) = test_state();
        add_agent(&state, AgentKind::Hub, "worker");

        let run = run_agent(State(state.clone()), Path("worker".to_string()), None)
            .await
            .unwrap();
        let polled = get_process_output(State(state), Path("worker".to_string()))
            .await
            .unwrap();
        assert_eq!(polled.process_id, run.process_id);
    }

    #[tokio::test]
    async fn test_stop_unknown_process() {
        let (_temp, state) = test_state();
        let result = stop_agent(State(state), Path("no-such-id".to_string())).await;
        assert!(matches!(result, Err(AppError::Execution(_))));
    }
}
