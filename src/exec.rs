//! External command execution.
//!
//! Every gcloud/gsutil invocation goes through the `Executor` trait as a
//! structured program + argv (plus an optional stdin payload), never as an
//! interpolated shell line. A mock implementation is provided for tests.

use std::process::Stdio;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::SparkmonError;

/// A command to execute: program, arguments, optional stdin payload.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl CommandSpec {
    /// Start a spec for the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Attach a stdin payload.
    pub fn stdin(mut self, body: impl Into<String>) -> Self {
        self.stdin = Some(body.into());
        self
    }

    /// One-line rendering for logs and diagnostics. Not re-parsed anywhere.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(|c: char| c.is_whitespace()) {
                line.push('\'');
                line.push_str(arg);
                line.push('\'');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

/// Outcome of one executed command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit status code (-1 when the process was killed by a signal).
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
    /// The rendered command line, kept for diagnostics.
    pub command: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Command execution seam.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run the command to completion, capturing output. `Err` only when the
    /// process cannot be spawned; a non-zero exit is reported in the result.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandResult, SparkmonError>;

    /// Run a command that must succeed. Non-zero exit becomes `CommandFailed`.
    async fn run_checked(&self, spec: CommandSpec) -> Result<CommandResult, SparkmonError> {
        let result = self.run(&spec).await?;
        if !result.success() {
            return Err(SparkmonError::CommandFailed {
                command: result.command,
                stderr: result.stderr.trim().to_string(),
            });
        }
        Ok(result)
    }

    /// Run a best-effort command. Failure is logged and reported in the
    /// result; it never aborts the run.
    async fn run_best_effort(&self, spec: CommandSpec) -> CommandResult {
        match self.run(&spec).await {
            Ok(result) => {
                if !result.success() {
                    warn!(
                        command = %result.command,
                        stderr = %result.stderr.trim(),
                        "best-effort command failed, continuing"
                    );
                }
                result
            }
            Err(e) => {
                let command = spec.command_line();
                warn!(command = %command, error = %e, "best-effort command could not run");
                CommandResult {
                    status: -1,
                    stdout: String::new(),
                    stderr: e.to_string(),
                    command,
                }
            }
        }
    }
}

/// Production executor backed by `tokio::process`.
pub struct ShellExecutor;

#[async_trait]
impl Executor for ShellExecutor {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandResult, SparkmonError> {
        let command_line = spec.command_line();
        debug!(command = %command_line, "spawning command");

        let mut command = tokio::process::Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = command.spawn()?;

        if let Some(body) = &spec.stdin {
            // take() so the pipe closes once the payload is written
            let mut pipe = child.stdin.take().ok_or_else(|| {
                SparkmonError::CommandFailed {
                    command: command_line.clone(),
                    stderr: "stdin pipe unavailable".to_string(),
                }
            })?;
            pipe.write_all(body.as_bytes()).await?;
            drop(pipe);
        }

        let output = child.wait_with_output().await?;

        Ok(CommandResult {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            command: command_line,
        })
    }
}

/// Scripted response for the mock executor.
#[derive(Debug, Clone)]
struct MockRule {
    /// Substring matched against the rendered command line.
    needle: String,
    status: i32,
    stdout: String,
    stderr: String,
}

/// Mock executor for tests and dry runs: records every command, answers
/// from scripted rules (first matching rule wins), succeeds with empty
/// output otherwise.
#[derive(Default)]
pub struct MockExecutor {
    recorded: Mutex<Vec<CommandSpec>>,
    rules: Mutex<Vec<MockRule>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed with the given stdout for commands containing `needle`.
    pub fn respond(&self, needle: impl Into<String>, stdout: impl Into<String>) {
        self.rules.lock().unwrap().push(MockRule {
            needle: needle.into(),
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        });
    }

    /// Fail with exit 1 and the given stderr for commands containing `needle`.
    pub fn fail_matching(&self, needle: impl Into<String>, stderr: impl Into<String>) {
        self.rules.lock().unwrap().push(MockRule {
            needle: needle.into(),
            status: 1,
            stdout: String::new(),
            stderr: stderr.into(),
        });
    }

    /// Snapshot of every command run so far.
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.recorded.lock().unwrap().clone()
    }

    /// Rendered command lines of every command run so far.
    pub fn command_lines(&self) -> Vec<String> {
        self.commands().iter().map(|c| c.command_line()).collect()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandResult, SparkmonError> {
        self.recorded.lock().unwrap().push(spec.clone());

        let command = spec.command_line();
        let rules = self.rules.lock().unwrap();
        let rule = rules.iter().find(|r| command.contains(&r.needle));

        Ok(match rule {
            Some(rule) => CommandResult {
                status: rule.status,
                stdout: rule.stdout.clone(),
                stderr: rule.stderr.clone(),
                command,
            },
            None => CommandResult {
                status: 0,
                stdout: String::new(),
                stderr: String::new(),
                command,
            },
        })
    }
}
