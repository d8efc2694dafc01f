//! Workspace introspection tools backed by the `git` CLI.
//!
//! All three run `git` as an argument vector in the workspace root with a
//! fixed timeout, and report a failing git (e.g. not a repository) as an
//! error result.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::context::ToolContext;
use crate::tools::handlers::shell::{ProcessOutput, run_process};
use crate::tools::tool::{Tool, ToolError, ToolResult, optional_bool, truncate_output};

/// Timeout for each git invocation.
const GIT_TIMEOUT: Duration = Duration::from_secs(15);

async fn git(root: &Path, args: &[&str], ctx: &ToolContext) -> Result<ProcessOutput, ToolError> {
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    run_process("git", &args, root, GIT_TIMEOUT, ctx).await
}

/// Counts parsed from `git status --porcelain=v1 --branch`.
#[derive(Debug, Default, PartialEq, Eq)]
struct StatusSummary {
    branch: Option<String>,
    staged: usize,
    modified: usize,
    untracked: usize,
    conflicted: usize,
    entries: Vec<String>,
}

fn parse_porcelain(output: &str) -> StatusSummary {
    let mut summary = StatusSummary::default();
    for line in output.lines() {
        if let Some(branch) = line.strip_prefix("## ") {
            let name = branch.split("...").next().unwrap_or(branch);
            summary.branch = Some(name.trim().to_string());
            continue;
        }
        let mut chars = line.chars();
        let (Some(x), Some(y)) = (chars.next(), chars.next()) else {
            continue;
        };
        match (x, y) {
            ('?', '?') => summary.untracked += 1,
            ('U', _) | (_, 'U') | ('A', 'A') | ('D', 'D') => summary.conflicted += 1,
            _ => {
                if x != ' ' {
                    summary.staged += 1;
                }
                if y != ' ' {
                    summary.modified += 1;
                }
            }
        }
        summary.entries.push(line.to_string());
    }
    summary
}

// ── WorkspaceStatusTool ─────────────────────────────────────────────

/// Summarizes the working tree state.
#[derive(Debug)]
pub struct WorkspaceStatusTool {
    root: PathBuf,
}

impl WorkspaceStatusTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for WorkspaceStatusTool {
    fn name(&self) -> &str {
        "workspace_status"
    }

    fn description(&self) -> &str {
        "Summarize the git working tree: current branch and counts of staged, modified, \
         untracked and conflicted files, followed by the file list."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(
        &self,
        _params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let output = git(&self.root, &["status", "--porcelain=v1", "--branch"], ctx).await?;
        if !output.success() {
            return Ok(output.into_result());
        }

        let summary = parse_porcelain(&output.stdout);
        let mut text = format!(
            "Branch: {}\nStaged: {}\nModified: {}\nUntracked: {}\nConflicted: {}",
            summary.branch.as_deref().unwrap_or("(detached)"),
            summary.staged,
            summary.modified,
            summary.untracked,
            summary.conflicted
        );
        if summary.entries.is_empty() {
            text.push_str("\n\nWorking tree clean.");
        } else {
            text.push_str("\n\n");
            text.push_str(&summary.entries.join("\n"));
        }
        Ok(ToolResult::text(truncate_output(&text)))
    }
}

// ── WorkspaceChangesTool ────────────────────────────────────────────

/// Summarizes uncommitted changes as a diffstat.
#[derive(Debug)]
pub struct WorkspaceChangesTool {
    root: PathBuf,
}

impl WorkspaceChangesTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for WorkspaceChangesTool {
    fn name(&self) -> &str {
        "workspace_changes"
    }

    fn description(&self) -> &str {
        "Summarize uncommitted changes (files changed, insertions, deletions). \
         Set staged=true to summarize only the changes staged for commit."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "staged": {
                    "type": "boolean",
                    "description": "Only staged changes (default false)"
                }
            },
            "required": []
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let staged = optional_bool(&params, "staged")?.unwrap_or(false);

        let mut args = vec!["diff", "--stat"];
        if staged {
            args.push("--cached");
        }
        let output = git(&self.root, &args, ctx).await?;
        if !output.success() {
            return Ok(output.into_result());
        }

        if output.stdout.trim().is_empty() {
            let scope = if staged { "staged" } else { "uncommitted" };
            return Ok(ToolResult::text(format!("No {} changes.", scope)));
        }
        Ok(ToolResult::text(truncate_output(&output.stdout)))
    }
}

// ── WorkspaceInfoTool ───────────────────────────────────────────────

/// Reports workspace metadata: root, branch, remote and last commit.
#[derive(Debug)]
pub struct WorkspaceInfoTool {
    root: PathBuf,
}

impl WorkspaceInfoTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for WorkspaceInfoTool {
    fn name(&self) -> &str {
        "workspace_info"
    }

    fn description(&self) -> &str {
        "Report workspace metadata as JSON: root path, current branch, origin remote URL \
         and the last commit."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(
        &self,
        _params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let branch = git(&self.root, &["rev-parse", "--abbrev-ref", "HEAD"], ctx).await?;
        if !branch.success() {
            return Ok(branch.into_result());
        }

        // A repository without an origin remote or without commits is still valid.
        let remote = git(&self.root, &["remote", "get-url", "origin"], ctx).await?;
        let last_commit = git(&self.root, &["log", "-1", "--format=%h %s"], ctx).await?;

        let trimmed = |output: &ProcessOutput| {
            output
                .success()
                .then(|| output.stdout.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let info = serde_json::json!({
            "root": self.root.display().to_string(),
            "branch": branch.stdout.trim(),
            "remote": trimmed(&remote),
            "lastCommit": trimmed(&last_commit),
        });
        let text = serde_json::to_string_pretty(&info)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        Ok(ToolResult::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    /// A fresh repository with one commit, or `None` when git is unavailable.
    fn git_repo() -> Option<TempDir> {
        let dir = TempDir::new().unwrap();
        let run = |args: &[&str]| {
            std::process::Command::new("git")
                .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
                .args(args)
                .current_dir(dir.path())
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        };
        if !run(&["init", "-q", "-b", "main"]) {
            return None;
        }
        std::fs::write(dir.path().join("a.txt"), "one\n").unwrap();
        if !(run(&["add", "a.txt"]) && run(&["commit", "-q", "-m", "initial"])) {
            return None;
        }
        Some(dir)
    }

    #[test]
    fn test_parse_porcelain() {
        let summary = parse_porcelain(
            "## main...origin/main [ahead 1]\nM  staged.rs\n M edited.rs\nMM both.rs\n?? new.rs\nUU clash.rs\n",
        );
        assert_eq!(summary.branch.as_deref(), Some("main"));
        assert_eq!(summary.staged, 2);
        assert_eq!(summary.modified, 2);
        assert_eq!(summary.untracked, 1);
        assert_eq!(summary.conflicted, 1);
        assert_eq!(summary.entries.len(), 5);
    }

    #[tokio::test]
    async fn test_status_reports_changes() {
        let Some(repo) = git_repo() else { return };
        std::fs::write(repo.path().join("a.txt"), "two\n").unwrap();
        std::fs::write(repo.path().join("b.txt"), "new\n").unwrap();

        let result = WorkspaceStatusTool::new(repo.path().to_path_buf())
            .execute(json!({}), &ToolContext::default())
            .await
            .unwrap();
        let text = result.text_content();
        assert!(!result.is_error());
        assert!(text.contains("Branch: main"));
        assert!(text.contains("Modified: 1"));
        assert!(text.contains("Untracked: 1"));
    }

    #[tokio::test]
    async fn test_changes_staged_flag() {
        let Some(repo) = git_repo() else { return };
        std::fs::write(repo.path().join("a.txt"), "two\n").unwrap();
        let tool = WorkspaceChangesTool::new(repo.path().to_path_buf());

        let unstaged = tool.execute(json!({}), &ToolContext::default()).await.unwrap();
        assert!(unstaged.text_content().contains("a.txt"));

        let staged = tool
            .execute(json!({"staged": true}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(staged.text_content(), "No staged changes.");

        let bad = tool.execute(json!({"staged": "yes"}), &ToolContext::default()).await;
        assert!(matches!(bad, Err(ToolError::InvalidParameters(_))));
    }

    #[tokio::test]
    async fn test_info_without_remote() {
        let Some(repo) = git_repo() else { return };
        let result = WorkspaceInfoTool::new(repo.path().to_path_buf())
            .execute(json!({}), &ToolContext::default())
            .await
            .unwrap();
        let info: serde_json::Value = serde_json::from_str(&result.text_content()).unwrap();
        assert_eq!(info["branch"], "main");
        assert_eq!(info["remote"], serde_json::Value::Null);
        assert!(info["lastCommit"].as_str().unwrap().ends_with("initial"));
    }

    #[tokio::test]
    async fn test_not_a_repository_is_error_result() {
        let dir = TempDir::new().unwrap();
        let result = WorkspaceStatusTool::new(dir.path().to_path_buf())
            .execute(json!({}), &ToolContext::default())
            .await;
        // Without git installed this is a spawn error; either way it is a failure.
        match result {
            Ok(r) => assert!(r.is_error()),
            Err(e) => assert!(matches!(e, ToolError::ExecutionFailed(_))),
        }
    }
}
