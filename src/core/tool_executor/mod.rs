#![allow(clippy::result_large_err)] // Invoker returns AppError to surface tool diagnostics without boxing.

//! Launches the external obfuscator as `<runtime> <entrypoint> --preset <name> <input>`.
//!
//! Arguments are passed as a discrete argv, never through a shell. The child
//! runs with stdin closed and stdout/stderr captured. On unix it leads its own
//! process group; when the deadline passes the group is killed and the child
//! reaped before control returns.

use crate::core::config::ToolConfig;
use crate::core::error::AppError;
use crate::core::types::{ErrorCategory, Preset};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

const OUTPUT_CAPTURE_LIMIT_BYTES: usize = 1_048_576;

/// Captured result of one successful invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
}

/// Failure modes of one invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("obfuscator timed out after {timeout:?}")]
    Timeout { timeout: Duration, stderr: String },
    #[error("obfuscator exited with {status}")]
    Failed {
        status: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("failed to wait for obfuscator: {0}")]
    Wait(#[source] std::io::Error),
}

impl From<ToolError> for AppError {
    fn from(err: ToolError) -> Self {
        let message = err.to_string();
        match err {
            ToolError::Spawn { program, .. } => {
                let mut app = AppError::new(ErrorCategory::ToolExecutionError, message)
                    .with_code("TOOL-001")
                    .with_public_message("obfuscator could not be started")
                    .with_suggestion("Check tool.runtime and tool.install_root");
                app.add_context("program", &program);
                app
            }
            ToolError::Timeout { timeout, stderr } => {
                let public = format!(
                    "obfuscator timed out after {}",
                    humantime::format_duration(timeout)
                );
                let mut app = AppError::new(ErrorCategory::TimeoutError, message)
                    .with_code("TOOL-003")
                    .with_public_message(public);
                app.add_context("stderr", &stderr);
                app
            }
            ToolError::Failed {
                status,
                exit_code,
                stdout,
                stderr,
            } => {
                let public = match exit_code {
                    Some(code) => format!("obfuscator exited with status {}", code),
                    None => "obfuscator was terminated by a signal".to_string(),
                };
                let mut app = AppError::new(ErrorCategory::ToolExecutionError, message)
                    .with_code("TOOL-002")
                    .with_public_message(public);
                app.add_context("status", &status);
                app.add_context("stdout", &stdout);
                app.add_context("stderr", &stderr);
                app
            }
            ToolError::Wait(_) => AppError::new(ErrorCategory::ToolExecutionError, message)
                .with_code("TOOL-004"),
        }
    }
}

/// Fully resolved description of one process launch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

#[async_trait]
pub trait ToolRunner: Send + Sync + 'static {
    async fn run(&self, invocation: &ToolInvocation) -> Result<InvocationResult, ToolError>;
}

/// Runs invocations as real child processes.
pub struct TokioToolRunner;

#[async_trait]
impl ToolRunner for TokioToolRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<InvocationResult, ToolError> {
        let start = Instant::now();
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The tool leads its own process group so helpers it starts die with it.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| ToolError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;
        let pid = child.id();

        let stdout_task = child.stdout.take().map(spawn_capture);
        let stderr_task = child.stderr.take().map(spawn_capture);

        let status = match tokio::time::timeout(invocation.timeout, child.wait()).await {
            Ok(status) => status.map_err(ToolError::Wait)?,
            Err(_) => {
                kill_process_group(pid);
                // kill() also reaps the child.
                if let Err(err) = child.kill().await {
                    tracing::warn!(error = %err, "failed to kill timed out obfuscator");
                }
                let stderr = collect_or_abort(stderr_task).await;
                abort_capture(stdout_task);
                return Err(ToolError::Timeout {
                    timeout: invocation.timeout,
                    stderr,
                });
            }
        };

        // Anything the tool left running must not outlive the job.
        kill_process_group(pid);
        let stdout = collect_or_abort(stdout_task).await;
        let stderr = collect_or_abort(stderr_task).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        into_result(status, stdout, stderr, duration_ms)
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        return;
    };
    #[allow(clippy::cast_possible_wrap)]
    let group = Pid::from_raw(pid as i32);
    match killpg(group, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(err) => tracing::warn!(pgid = pid, error = %err, "failed to kill obfuscator process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

fn into_result(
    status: ExitStatus,
    stdout: String,
    stderr: String,
    duration_ms: u64,
) -> Result<InvocationResult, ToolError> {
    if !status.success() {
        return Err(ToolError::Failed {
            status: status.to_string(),
            exit_code: status.code(),
            stdout,
            stderr,
        });
    }
    Ok(InvocationResult {
        stdout,
        stderr,
        exit_code: status.code().unwrap_or(0),
        duration_ms,
    })
}

fn spawn_capture<R>(mut reader: R) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut captured = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    // Keep draining past the cap so the child never blocks on a full pipe.
                    let room = OUTPUT_CAPTURE_LIMIT_BYTES.saturating_sub(captured.len());
                    captured.extend_from_slice(&chunk[..n.min(room)]);
                }
            }
        }
        String::from_utf8_lossy(&captured).into_owned()
    })
}

// A process outside the group may still hold the pipe open after the child exits.
async fn collect_or_abort(task: Option<JoinHandle<String>>) -> String {
    let Some(mut task) = task else {
        return String::new();
    };
    match tokio::time::timeout(Duration::from_millis(250), &mut task).await {
        Ok(captured) => captured.unwrap_or_default(),
        Err(_) => {
            task.abort();
            String::new()
        }
    }
}

fn abort_capture(task: Option<JoinHandle<String>>) {
    if let Some(task) = task {
        task.abort();
    }
}

/// Builds obfuscator invocations from configuration and hands them to a runner.
#[derive(Clone)]
pub struct TransformationInvoker {
    runtime: String,
    entrypoint: String,
    install_root: PathBuf,
    timeout: Duration,
    runner: Arc<dyn ToolRunner>,
}

impl TransformationInvoker {
    pub fn new(config: &ToolConfig) -> Self {
        Self::with_runner(config, Arc::new(TokioToolRunner))
    }

    pub fn with_runner(config: &ToolConfig, runner: Arc<dyn ToolRunner>) -> Self {
        TransformationInvoker {
            runtime: config.runtime.clone(),
            entrypoint: config.entrypoint.clone(),
            install_root: config.install_root.clone(),
            timeout: config.timeout,
            runner,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Describe the launch for `input` without running it.
    pub fn invocation(&self, input: &Path, preset: Preset, timeout: Duration) -> ToolInvocation {
        ToolInvocation {
            program: self.runtime.clone(),
            args: vec![
                self.entrypoint.clone(),
                "--preset".to_string(),
                preset.as_str().to_string(),
                input.to_string_lossy().into_owned(),
            ],
            cwd: self.install_root.clone(),
            timeout,
        }
    }

    /// Run the obfuscator against `input`. Non-empty stderr alone is not a
    /// failure; only the exit status and the deadline decide.
    pub async fn run(
        &self,
        input: &Path,
        preset: Preset,
        timeout: Duration,
    ) -> Result<InvocationResult, AppError> {
        let invocation = self.invocation(input, preset, timeout);
        tracing::debug!(
            program = %invocation.program,
            args = ?invocation.args,
            cwd = %invocation.cwd.display(),
            timeout_ms = timeout.as_millis() as u64,
            "executing obfuscator"
        );
        let result = self.runner.run(&invocation).await?;
        if !result.stderr.trim().is_empty() {
            tracing::info!(stderr = %result.stderr.trim_end(), "obfuscator wrote to stderr");
        }
        Ok(result)
    }
}
