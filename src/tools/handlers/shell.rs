//! Shell strategy: argument-vector process execution from a command template.
//!
//! The template is split into tokens once, at construction, and each token
//! is interpolated on its own at call time. Argument values therefore never
//! pass through a shell and cannot add tokens, pipes or redirections.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::context::ToolContext;
use crate::tools::handlers::{Handler, HandlerBuildError, ShellConfig};
use crate::tools::interpolate::{interpolate, placeholders};
use crate::tools::sandbox::{canonical_base, resolve_confined};
use crate::tools::tool::{ToolError, ToolResult, truncate_output};

/// Default command timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Map to a tool result: stdout on success (plus a labeled stderr tail),
    /// stderr (or stdout when stderr is empty) on failure.
    pub fn into_result(self) -> ToolResult {
        if self.success() {
            let stderr = self.stderr.trim_end();
            if stderr.is_empty() {
                ToolResult::text(truncate_output(&self.stdout))
            } else {
                ToolResult::text(truncate_output(&format!(
                    "{}\n\n--- stderr ---\n{}",
                    self.stdout, stderr
                )))
            }
        } else {
            let message = if self.stderr.trim().is_empty() {
                &self.stdout
            } else {
                &self.stderr
            };
            let code = self
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            ToolResult::error(format!(
                "Command failed (exit code {}): {}",
                code,
                truncate_output(message.trim_end())
            ))
        }
    }
}

/// Spawn `program` with `args` (no shell) and wait for it, bounded by `timeout`.
///
/// The child is killed when the timeout elapses or the context is cancelled.
pub async fn run_process(
    program: &str,
    args: &[String],
    cwd: &Path,
    timeout: Duration,
    ctx: &ToolContext,
) -> Result<ProcessOutput, ToolError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|e| {
        ToolError::ExecutionFailed(format!("Failed to spawn '{}': {}", program, e))
    })?;
    tracing::debug!(
        program,
        args = args.len(),
        cwd = %cwd.display(),
        tool_use_id = %ctx.tool_use_id,
        "Spawned process"
    );

    // Dropping the wait future drops the child, and kill_on_drop terminates it.
    tokio::select! {
        output = child.wait_with_output() => {
            let output = output.map_err(|e| {
                ToolError::ExecutionFailed(format!("Command execution failed: {}", e))
            })?;
            Ok(ProcessOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code(),
            })
        }
        _ = tokio::time::sleep(timeout) => Err(ToolError::Timeout(timeout)),
        _ = ctx.cancelled() => Err(ToolError::Cancelled),
    }
}

/// Remove one pair of matching surrounding quotes.
fn strip_quotes(token: &str) -> &str {
    for quote in ['"', '\''] {
        if token.len() >= 2 && token.starts_with(quote) && token.ends_with(quote) {
            return &token[1..token.len() - 1];
        }
    }
    token
}

/// Executes a tokenized command template.
#[derive(Debug)]
pub struct ShellHandler {
    tokens: Vec<String>,
    cwd: PathBuf,
    timeout: Duration,
}

impl ShellHandler {
    pub fn new(config: &ShellConfig, workspace_root: &Path) -> Result<Self, HandlerBuildError> {
        let tokens: Vec<String> = config
            .command
            .split_whitespace()
            .map(|t| strip_quotes(t).to_string())
            .collect();

        let Some(program) = tokens.first() else {
            return Err(HandlerBuildError::invalid("shell", "command is empty"));
        };
        if !placeholders(program).is_empty() {
            return Err(HandlerBuildError::invalid(
                "shell",
                format!("program must be a literal, got '{}'", program),
            ));
        }

        let cwd = match &config.cwd {
            Some(cwd) => resolve_confined(workspace_root, cwd)
                .map_err(|e| HandlerBuildError::invalid("shell", e.to_string()))?,
            None => canonical_base(workspace_root),
        };

        Ok(Self {
            tokens,
            cwd,
            timeout: config
                .timeout
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TIMEOUT),
        })
    }

    /// Interpolate every token independently into the final argument vector.
    ///
    /// Matching surrounding quotes are stripped again after substitution, so
    /// a fully quoted value is unquoted while embedded quotes stay.
    fn argv(&self, args: &serde_json::Value) -> Result<Vec<String>, ToolError> {
        self.tokens
            .iter()
            .map(|token| Ok(strip_quotes(&interpolate(token, args)?).to_string()))
            .collect()
    }
}

#[async_trait]
impl Handler for ShellHandler {
    async fn run(
        &self,
        args: &serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let argv = self.argv(args)?;
        let (program, rest) = argv
            .split_first()
            .ok_or_else(|| ToolError::ExecutionFailed("empty command".to_string()))?;

        let output = run_process(program, rest, &self.cwd, self.timeout, ctx).await?;
        Ok(output.into_result())
    }
}
