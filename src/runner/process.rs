//! Agent process runner
//!
//! Spawns hub agents and example dataflows as subprocesses, pumps their
//! output line-by-line into in-memory buffers, and keeps a registry of
//! running processes so callers can poll output and stop them later.
//!
//! A run request waits up to its timeout for the child to exit and then
//! answers with a snapshot; hitting the timeout is not an error, the child
//! keeps running in the background under its process id.

use crate::config::{Config, ExecutionConfig};
use crate::error::AppError;
use crate::runner::ExecutionError;
use crate::services::dataflow::DataflowLocator;
use crate::services::workspace::{validate_agent_name, AgentKind, RootSet};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Interval between exit checks while a run request waits on its child
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Unique identifier of a registered process
pub type ProcessId = String;

/// Snapshot of a registered process
#[derive(Debug)]
pub struct RunReport {
    /// Registry id of the process
    pub process_id: ProcessId,
    /// Agent the process was started for
    pub agent: String,
    /// Output captured so far (stdout and stderr interleaved, newline joined)
    pub output: String,
    /// Whether the process is still running
    pub running: bool,
}

/// A registered child process and its output buffer
struct ProcessEntry {
    agent: String,
    child: Child,
    output: Arc<Mutex<Vec<String>>>,
    started: Instant,
    finished: bool,
}

/// Subprocess lifecycle manager for agent runs
pub struct AgentRunner {
    execution: ExecutionConfig,
    roots: RootSet,
    dataflow: DataflowLocator,
    processes: Mutex<HashMap<ProcessId, ProcessEntry>>,
}

impl AgentRunner {
    /// Create a runner from the application configuration
    pub fn new(config: &Config) -> Self {
        Self {
            execution: config.execution.clone(),
            roots: RootSet::new(&config.workspace),
            dataflow: DataflowLocator::new(&config.workspace),
            processes: Mutex::new(HashMap::new()),
        }
    }

    /// Default wait window for run requests that do not supply one
    pub fn default_timeout_secs(&self) -> u64 {
        self.execution.default_timeout_secs
    }

    /// Run a hub agent via the configured agent CLI
    pub async fn start_agent(&self, name: &str, timeout_secs: u64) -> Result<RunReport, AppError> {
        validate_agent_name(name)?;
        let agent_dir = self.roots.root_of(AgentKind::Hub).join(name);
        if !agent_dir.is_dir() {
            return Err(AppError::AgentNotFound(format!(
                "{name} not found in agent-hub directory"
            )));
        }

        let mut cmd = Command::new(&self.execution.agent_command);
        cmd.arg("run")
            .arg("--agent-name")
            .arg(name)
            .current_dir(&agent_dir);

        info!(agent = %name, command = %self.execution.agent_command, "Starting hub agent");
        self.spawn_and_watch(name, cmd, timeout_secs).await
    }

    /// Run an example by resolving its dataflow file and handing it to the
    /// configured dataflow CLI
    pub async fn start_example(
        &self,
        name: &str,
        timeout_secs: u64,
    ) -> Result<RunReport, AppError> {
        let descriptor = self.dataflow.locate(name)?;

        let mut cmd = Command::new(&self.execution.dataflow_command);
        cmd.arg("start")
            .arg(&descriptor.primary)
            .current_dir(&descriptor.agent_path);

        info!(
            agent = %name,
            dataflow = %descriptor.primary,
            command = %self.execution.dataflow_command,
            "Starting example dataflow"
        );
        self.spawn_and_watch(name, cmd, timeout_secs).await
    }

    async fn spawn_and_watch(
        &self,
        agent: &str,
        mut cmd: Command,
        timeout_secs: u64,
    ) -> Result<RunReport, AppError> {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(ExecutionError::SpawnFailed)?;
        let output = Arc::new(Mutex::new(Vec::new()));

        if let Some(stdout) = child.stdout.take() {
            pump_lines(stdout, Arc::clone(&output));
        }
        if let Some(stderr) = child.stderr.take() {
            pump_lines(stderr, Arc::clone(&output));
        }

        let process_id: ProcessId = uuid::Uuid::new_v4().to_string();
        debug!(agent = %agent, process_id = %process_id, "Registered process");
        {
            let mut processes = self.processes.lock().await;
            processes.insert(
                process_id.clone(),
                ProcessEntry {
                    agent: agent.to_string(),
                    child,
                    output,
                    started: Instant::now(),
                    finished: false,
                },
            );
        }

        // Wait for exit up to the timeout; a still-running child is a
        // normal outcome, reported through the `running` flag.
        let deadline = Instant::now() + Duration::from_secs(timeout_secs);
        loop {
            if self.check_finished(&process_id).await? {
                break;
            }
            if Instant::now() >= deadline {
                debug!(agent = %agent, process_id = %process_id, "Run wait window exhausted");
                break;
            }
            sleep(POLL_INTERVAL).await;
        }

        self.snapshot(&process_id).await
    }

    async fn check_finished(&self, process_id: &str) -> Result<bool, AppError> {
        let mut processes = self.processes.lock().await;
        let entry = processes
            .get_mut(process_id)
            .ok_or_else(|| ExecutionError::ProcessNotFound(process_id.to_string()))?;

        if !entry.finished {
            let status = entry
                .child
                .try_wait()
                .map_err(|e| ExecutionError::ProcessFailed(format!("Failed to poll child: {e}")))?;
            if let Some(status) = status {
                debug!(
                    agent = %entry.agent,
                    process_id = %process_id,
                    exit_code = status.code().unwrap_or(-1),
                    "Process exited"
                );
                entry.finished = true;
            }
        }
        Ok(entry.finished)
    }

    async fn snapshot(&self, process_id: &str) -> Result<RunReport, AppError> {
        let mut processes = self.processes.lock().await;
        let entry = processes
            .get_mut(process_id)
            .ok_or_else(|| ExecutionError::ProcessNotFound(process_id.to_string()))?;

        let output = entry.output.lock().await.join("\n");
        Ok(RunReport {
            process_id: process_id.to_string(),
            agent: entry.agent.clone(),
            output,
            running: !entry.finished,
        })
    }

    /// Snapshot of the most recently started process for an agent
    pub async fn output(&self, agent: &str) -> Result<RunReport, AppError> {
        validate_agent_name(agent)?;

        let process_id = {
            let processes = self.processes.lock().await;
            processes
                .iter()
                .filter(|(_, entry)| entry.agent == agent)
                .max_by_key(|(_, entry)| entry.started)
                .map(|(id, _)| id.clone())
                .ok_or_else(|| ExecutionError::ProcessNotFound(agent.to_string()))?
        };

        self.check_finished(&process_id).await?;
        self.snapshot(&process_id).await
    }

    /// Kill a registered process; its output stays pollable afterwards
    pub async fn stop(&self, process_id: &str) -> Result<RunReport, AppError> {
        {
            let mut processes = self.processes.lock().await;
            let entry = processes
                .get_mut(process_id)
                .ok_or_else(|| ExecutionError::ProcessNotFound(process_id.to_string()))?;

            let already_exited = entry
                .child
                .try_wait()
                .map_err(|e| ExecutionError::ProcessFailed(format!("Failed to poll child: {e}")))?
                .is_some();
            if !already_exited {
                entry
                    .child
                    .kill()
                    .await
                    .map_err(|e| ExecutionError::ProcessFailed(format!("Failed to kill: {e}")))?;
            }
            entry.finished = true;
            info!(agent = %entry.agent, process_id = %process_id, "Stopped process");
        }

        self.snapshot(process_id).await
    }

    /// Read the newest run log of an agent, if one exists
    ///
    /// Logs live under `<agent_dir>/logs/` as `*.log`/`*.txt` files. Absence
    /// is a normal outcome; read failures are logged and treated as absent.
    pub fn logs(&self, agent: &str) -> Result<Option<String>, AppError> {
        validate_agent_name(agent)?;

        let Some((_, agent_dir)) = self.roots.find_first_existing(Path::new(agent)) else {
            return Ok(None);
        };

        let logs_dir = agent_dir.join("logs");
        let entries = match std::fs::read_dir(&logs_dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(None),
        };

        let mut newest = None;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_log = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("log") || e.eq_ignore_ascii_case("txt"))
                .unwrap_or(false);
            if !is_log || !path.is_file() {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            if newest
                .as_ref()
                .map(|(best, _)| modified > *best)
                .unwrap_or(true)
            {
                newest = Some((modified, path));
            }
        }

        match newest {
            Some((_, path)) => match std::fs::read_to_string(&path) {
                Ok(content) => Ok(Some(content)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read log file");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }
}

/// Pump lines from a child pipe into the shared output buffer
fn pump_lines<R>(reader: R, buffer: Arc<Mutex<Vec<String>>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            buffer.lock().await.push(line);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServerConfig, WorkspaceConfig};
    use tempfile::{tempdir, TempDir};

    fn test_runner(agent_command: &str, dataflow_command: &str) -> (TempDir, AgentRunner) {
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
                agent_command: agent_command.to_string(),
                dataflow_command: dataflow_command.to_string(),
            },
        };
        std::fs::create_dir_all(&config.workspace.hub_dir).unwrap();
        std::fs::create_dir_all(&config.workspace.examples_dir).unwrap();
        (temp, AgentRunner::new(&config))
    }

    fn add_hub_agent(runner: &AgentRunner, name: &str) {
        std::fs::create_dir_all(runner.roots.root_of(AgentKind::Hub).join(name)).unwrap();
    }

    #[cfg(unix)]
    fn write_script(temp: &TempDir, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = temp.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn test_run_agent_captures_output() {
        let (_temp, runner) = test_runner("echo", "echo");
        add_hub_agent(&runner, "greeter");

        let report = runner.start_agent("greeter", 2).await.unwrap();
        assert!(report.output.contains("run --agent-name greeter"));
        assert!(!report.running, "echo should exit within the wait window");
        assert!(!report.process_id.is_empty());
    }

    #[tokio::test]
    async fn test_run_missing_agent() {
        let (_temp, runner) = test_runner("echo", "echo");
        assert!(matches!(
            runner.start_agent("ghost", 1).await,
            Err(AppError::AgentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_run_with_nonexistent_command() {
        let (_temp, runner) = test_runner("nonexistent-command-that-does-not-exist-12345", "echo");
        add_hub_agent(&runner, "greeter");

        let result = runner.start_agent("greeter", 1).await;
        assert!(matches!(
            result,
            Err(AppError::Execution(ExecutionError::SpawnFailed(_)))
        ));
    }

    #[tokio::test]
    async fn test_run_example_uses_dataflow_file() {
        let (_temp, runner) = test_runner("echo", "echo");
        let example_dir = runner.roots.root_of(AgentKind::Example).join("demo");
        std::fs::create_dir_all(&example_dir).unwrap();
        std::fs::write(example_dir.join("demo_dataflow.yml"), "nodes: []\n").unwrap();

        let report = runner.start_example("demo", 2).await.unwrap();
        assert!(report.output.contains("start demo_dataflow.yml"));
        assert!(!report.running);
    }

    #[tokio::test]
    async fn test_run_example_without_dataflow() {
        let (_temp, runner) = test_runner("echo", "echo");
        let example_dir = runner.roots.root_of(AgentKind::Example).join("bare");
        std::fs::create_dir_all(&example_dir).unwrap();

        assert!(matches!(
            runner.start_example("bare", 1).await,
            Err(AppError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_output_returns_latest_process() {
        let (_temp, runner) = test_runner("echo", "echo");
        add_hub_agent(&runner, "greeter");

        let report = runner.start_agent("greeter", 2).await.unwrap();
        let polled = runner.output("greeter").await.unwrap();
        assert_eq!(polled.process_id, report.process_id);
        assert_eq!(polled.output, report.output);
        assert!(!polled.running);
    }

    #[tokio::test]
    async fn test_output_unknown_agent() {
        let (_temp, runner) = test_runner("echo", "echo");
        assert!(matches!(
            runner.output("never-ran").await,
            Err(AppError::Execution(ExecutionError::ProcessNotFound(_)))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_leaves_process_running_then_stop() {
        let (_temp, runner) = {
            let temp = tempdir().unwrap();
            let script = write_script(&temp, "slow.sh", "sleep 30");
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
                    default_timeout_secs: 1,
                    agent_command: script,
                    dataflow_command: "echo".to_string(),
                },
            };
            std::fs::create_dir_all(&config.workspace.hub_dir).unwrap();
            std::fs::create_dir_all(&config.workspace.examples_dir).unwrap();
            (temp, AgentRunner::new(&config))
        };
        add_hub_agent(&runner, "slowpoke");

        let report = runner.start_agent("slowpoke", 1).await.unwrap();
        assert!(report.running, "sleep 30 should outlive a 1s wait window");

        let stopped = runner.stop(&report.process_id).await.unwrap();
        assert!(!stopped.running);

        // Output of the stopped process stays pollable.
        let polled = runner.output("slowpoke").await.unwrap();
        assert!(!polled.running);
    }

    #[tokio::test]
    async fn test_stop_unknown_process() {
        let (_temp, runner) = test_runner("echo", "echo");
        assert!(matches!(
            runner.stop("no-such-id").await,
            Err(AppError::Execution(ExecutionError::ProcessNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_logs_absent_is_none() {
        let (_temp, runner) = test_runner("echo", "echo");
        add_hub_agent(&runner, "quiet");

        assert!(runner.logs("quiet").unwrap().is_none());
        assert!(runner.logs("ghost").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logs_reads_log_file() {
        let (_temp, runner) = test_runner("echo", "echo");
        add_hub_agent(&runner, "chatty");
        let logs_dir = runner.roots.root_of(AgentKind::Hub).join("chatty/logs");
        std::fs::create_dir_all(&logs_dir).unwrap();
        std::fs::write(logs_dir.join("run.log"), "started\ndone\n").unwrap();

        let logs = runner.logs("chatty").unwrap();
        assert_eq!(logs.as_deref(), Some("started\ndone\n"));
    }
}
