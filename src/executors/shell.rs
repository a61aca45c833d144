//! Shell command execution
//!
//! Commands run through `sh -c` in the workspace. Every running child is
//! tracked in a process table so that `cleanup()` can terminate it.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{ AsyncRead, AsyncReadExt };
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{ debug, info, warn };
use uuid::Uuid;

use super::{ LazyResource, ToolExecutor, parse_arguments };
use crate::errors::Error;
use crate::types::{ CallToolResult, Content, Tool };

/// Parameters of `execute_command`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExecuteCommandParams {
    /// Command line passed to `sh -c`
    pub command: String,
    /// Working directory, relative to the workspace
    pub cwd: Option<String>,
    /// Seconds to wait before the command is killed
    pub timeout_secs: Option<u64>,
}

/// Kill switches for running children
#[derive(Default)]
struct ProcessTable {
    running: HashMap<Uuid, oneshot::Sender<()>>,
}

enum Outcome {
    Finished(std::io::Result<std::process::ExitStatus>, String, String),
    TimedOut,
    Killed,
}

pub struct ShellExecutor {
    workspace_root: PathBuf,
    default_timeout: Duration,
    processes: LazyResource<ProcessTable>,
}

impl ShellExecutor {
    pub fn new(workspace_root: PathBuf, default_timeout: Duration) -> Self {
        Self {
            workspace_root,
            default_timeout,
            processes: LazyResource::new(),
        }
    }

    async fn track(&self, id: Uuid, kill: oneshot::Sender<()>) -> Result<(), Error> {
        let mut table = self.processes.acquire(|| async {
            info!("Creating shell process table");
            Ok(ProcessTable::default())
        }).await?;
        table.running.insert(id, kill);
        Ok(())
    }

    async fn untrack(&self, id: &Uuid) {
        if let Some(mut table) = self.processes.existing().await {
            table.running.remove(id);
        }
    }

    /// Number of children currently tracked
    pub async fn running(&self) -> usize {
        match self.processes.existing().await {
            Some(table) => table.running.len(),
            None => 0,
        }
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<CallToolResult, Error> {
        let cwd = match &params.cwd {
            Some(dir) => self.workspace_root.join(dir),
            None => self.workspace_root.clone(),
        };
        let timeout = params.timeout_secs.map(Duration::from_secs).unwrap_or(self.default_timeout);

        debug!("Running `{}` in {} (timeout {:?})", params.command, cwd.display(), timeout);

        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&params.command)
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // own group, so background children can be killed with the shell
        #[cfg(unix)]
        {
            command.process_group(0);
        }

        let mut child = command
            .spawn()
            .map_err(|e| Error::Execution(format!("Failed to spawn process: {}", e)))?;
        let pid = child.id();

        let stdout = child.stdout
            .take()
            .ok_or_else(|| Error::Execution("Failed to capture stdout".to_string()))?;
        let stderr = child.stderr
            .take()
            .ok_or_else(|| Error::Execution("Failed to capture stderr".to_string()))?;

        let id = Uuid::new_v4();
        let (kill_tx, kill_rx) = oneshot::channel();
        self.track(id, kill_tx).await?;

        // output pipes stay open while any process in the group holds them
        let run = async {
            let (status, stdout, stderr) = tokio::join!(
                child.wait(),
                read_all(stdout),
                read_all(stderr)
            );
            Outcome::Finished(status, stdout, stderr)
        };
        let outcome = tokio::select! {
            finished = tokio::time::timeout(timeout, run) => finished.unwrap_or(Outcome::TimedOut),
            _ = kill_rx => Outcome::Killed,
        };
        self.untrack(&id).await;

        let (status, stdout, stderr) = match outcome {
            Outcome::Finished(status, stdout, stderr) => (status?, stdout, stderr),
            Outcome::TimedOut => {
                kill_process_group(pid).await;
                let _ = child.kill().await;
                warn!("Command timed out after {:?}: {}", timeout, params.command);
                return Err(
                    Error::Execution(
                        format!("Command timed out after {}s: {}", timeout.as_secs(), params.command)
                    )
                );
            }
            Outcome::Killed => {
                kill_process_group(pid).await;
                let _ = child.kill().await;
                return Err(Error::Execution(format!("Command terminated: {}", params.command)));
            }
        };

        let exit_code = status.code().unwrap_or(-1);

        let mut content = vec![Content::text(format!("exit status: {}", exit_code))];
        if !stdout.is_empty() {
            content.push(Content::text(stdout));
        }
        if !stderr.is_empty() {
            content.push(Content::text(format!("stderr:\n{}", stderr)));
        }

        Ok(CallToolResult {
            content,
            is_error: !status.success(),
        })
    }
}

/// Kill every process in the group led by `pid`
async fn kill_process_group(pid: Option<u32>) {
    #[cfg(unix)]
    {
        if let Some(pid) = pid {
            let killed = Command::new("kill")
                .arg("-KILL")
                .arg("--")
                .arg(format!("-{}", pid))
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status().await;
            if let Err(e) = killed {
                warn!("Failed to kill process group {}: {}", pid, e);
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pid;
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> String {
    let mut buf = Vec::new();
    let _ = reader.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

#[async_trait]
impl ToolExecutor for ShellExecutor {
    fn family(&self) -> &str {
        "shell"
    }

    fn operations(&self) -> Vec<Tool> {
        vec![
            Tool::for_params::<ExecuteCommandParams>(
                "execute_command",
                "Run a shell command in the workspace and return its exit status and output"
            )
        ]
    }

    async fn execute(&self, operation: &str, arguments: Value) -> Result<CallToolResult, Error> {
        match operation {
            "execute_command" => self.execute_command(parse_arguments(operation, arguments)?).await,
            other => Err(Error::Execution(format!("shell executor has no operation '{}'", other))),
        }
    }

    async fn cleanup(&self) -> Result<(), Error> {
        if let Some(table) = self.processes.take().await {
            info!("Terminating {} tracked process(es)", table.running.len());
            for (_, kill) in table.running {
                let _ = kill.send(());
            }
        }
        Ok(())
    }
}
