//! Process execution with timeout and output ceilings
//!
//! Every external tool call (yt-dlp, ffmpeg) goes through a [`ToolRunner`].
//! The production implementation, [`ProcessRunner`], races the child against
//! a wall-clock deadline and kills it when the deadline passes or when its
//! captured output grows past the configured ceiling.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use crate::core::config::ExecLimits;

/// Process execution failures.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The binary could not be started at all
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Wall-clock deadline passed; the child was killed
    #[error("process timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// stdout or stderr grew past the ceiling; the child was killed
    #[error("process output exceeded maxBuffer of {limit} bytes")]
    OutputOverflow { limit: usize },

    /// The process exited unsuccessfully
    #[error("process exited with code {code:?}: {stderr}")]
    Failed {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// IO failure while waiting for or reading from the child
    #[error("process IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// Failures that a cheaper retry may get past.
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(self, ExecError::Timeout(_) | ExecError::OutputOverflow { .. })
    }
}

/// A fully specified external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; inherited from the server when `None`
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
        }
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Shell-escaped command line, for logs only. Nothing is run through a shell.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| shell_escape::escape(part.as_str().into()).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured output of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Seam between orchestration and the operating system.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the invocation to completion within `limits`.
    ///
    /// Returns `Ok` only when the process exited successfully.
    async fn run(&self, invocation: &Invocation, limits: ExecLimits) -> Result<ExecOutput, ExecError>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation, limits: ExecLimits) -> Result<ExecOutput, ExecError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        // Own process group, so helpers the tool forks (ffmpeg) die with it.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        let outcome = tokio::time::timeout(limits.timeout, collect(&mut child, limits.max_output_bytes)).await;

        match outcome {
            Ok(Ok((status, stdout, stderr))) => {
                if status.success() {
                    Ok(ExecOutput { stdout, stderr })
                } else {
                    Err(ExecError::Failed {
                        code: status.code(),
                        stdout,
                        stderr,
                    })
                }
            }
            Ok(Err(e)) => {
                kill_child(&mut child, &invocation.program).await;
                Err(e)
            }
            Err(_) => {
                log::error!(
                    "{} timed out after {}s, killing",
                    invocation.program,
                    limits.timeout.as_secs()
                );
                kill_child(&mut child, &invocation.program).await;
                Err(ExecError::Timeout(limits.timeout))
            }
        }
    }
}

/// Drain both pipes concurrently, then reap the child.
async fn collect(child: &mut Child, max_output_bytes: usize) -> Result<(ExitStatus, String, String), ExecError> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (stdout, stderr) = tokio::try_join!(
        read_capped(stdout, max_output_bytes),
        read_capped(stderr, max_output_bytes)
    )?;
    let status = child.wait().await?;

    Ok((
        status,
        String::from_utf8_lossy(&stdout).into_owned(),
        String::from_utf8_lossy(&stderr).into_owned(),
    ))
}

async fn read_capped<R>(pipe: Option<R>, limit: usize) -> Result<Vec<u8>, ExecError>
where
    R: AsyncRead + Unpin,
{
    let Some(mut pipe) = pipe else {
        return Ok(Vec::new());
    };

    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = pipe.read(&mut chunk).await?;
        if n == 0 {
            return Ok(buf);
        }
        if buf.len() + n > limit {
            return Err(ExecError::OutputOverflow { limit });
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

async fn kill_child(child: &mut Child, program: &str) {
    #[cfg(unix)]
    kill_process_group(child, program);

    // kill() also waits, so the child is reaped here.
    if let Err(e) = child.kill().await {
        log::warn!("Failed to kill {}: {}", program, e);
    }
}

/// SIGKILL every process in the child's group. The child is the group leader,
/// so its pid is the group id.
#[cfg(unix)]
fn kill_process_group(child: &Child, program: &str) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pgid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => log::warn!("Failed to kill process group of {}: {}", program, e),
    }
}
