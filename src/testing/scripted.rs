//! Scripted [`ToolRunner`] implementation

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::core::config::ExecLimits;
use crate::core::process::{ExecError, ExecOutput, Invocation, ToolRunner};

/// What the next call should do.
#[derive(Debug, Clone)]
pub enum Step {
    /// Exit 0 with this stdout, optionally leaving a file in the working directory
    Succeed {
        stdout: String,
        file: Option<(String, Vec<u8>)>,
    },
    /// Behave as if the deadline passed
    Timeout,
    /// Behave as if stdout grew past the ceiling
    Overflow,
    /// Exit 1 with this stderr
    Fail { stderr: String },
}

impl Step {
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Step::Succeed {
            stdout: stdout.into(),
            file: None,
        }
    }

    pub fn succeed_with_file(name: impl Into<String>, contents: &[u8]) -> Self {
        Step::Succeed {
            stdout: String::new(),
            file: Some((name.into(), contents.to_vec())),
        }
    }

    pub fn fail(stderr: impl Into<String>) -> Self {
        Step::Fail { stderr: stderr.into() }
    }
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub invocation: Invocation,
    pub limits: ExecLimits,
}

/// Replays a fixed script of [`Step`]s. Calls past the end of the script fail.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<RecordedCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedRunner {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Steps not consumed yet.
    pub fn remaining(&self) -> usize {
        lock(&self.steps).len()
    }
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation, limits: ExecLimits) -> Result<ExecOutput, ExecError> {
        lock(&self.calls).push(RecordedCall {
            invocation: invocation.clone(),
            limits,
        });
        let step = lock(&self.steps).pop_front();

        match step {
            Some(Step::Succeed { stdout, file }) => {
                if let (Some((name, contents)), Some(dir)) = (file, invocation.cwd.as_ref()) {
                    tokio::fs::write(dir.join(name), contents).await?;
                }
                Ok(ExecOutput {
                    stdout,
                    stderr: String::new(),
                })
            }
            Some(Step::Timeout) => Err(ExecError::Timeout(limits.timeout)),
            Some(Step::Overflow) => Err(ExecError::OutputOverflow {
                limit: limits.max_output_bytes,
            }),
            Some(Step::Fail { stderr }) => Err(ExecError::Failed {
                code: Some(1),
                stdout: String::new(),
                stderr,
            }),
            None => Err(ExecError::Failed {
                code: None,
                stdout: String::new(),
                stderr: format!("unexpected call: {}", invocation.display()),
            }),
        }
    }
}
