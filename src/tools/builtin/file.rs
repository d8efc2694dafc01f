//! Project-confined file reader.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::context::ToolContext;
use crate::tools::handlers::file_read::{DEFAULT_MAX_SIZE, read_confined};
use crate::tools::tool::{Tool, ToolError, ToolResult, optional_u64, require_str};

/// Reads files inside the workspace root, optionally sliced to a line range.
#[derive(Debug)]
pub struct ReadFileTool {
    root: PathBuf,
    max_size: u64,
}

impl ReadFileTool {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            max_size: DEFAULT_MAX_SIZE,
        }
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }
}

/// Validated 1-indexed inclusive line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineRange {
    start: usize,
    end: Option<usize>,
}

impl LineRange {
    fn from_params(params: &serde_json::Value) -> Result<Self, ToolError> {
        let start = optional_u64(params, "startLine")?.unwrap_or(1) as usize;
        let end = optional_u64(params, "endLine")?.map(|n| n as usize);

        if start == 0 {
            return Err(ToolError::InvalidParameters(
                "startLine is 1-indexed and must be at least 1".to_string(),
            ));
        }
        if let Some(end) = end
            && end < start
        {
            return Err(ToolError::InvalidParameters(format!(
                "endLine ({}) must not be before startLine ({})",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    fn is_whole_file(&self) -> bool {
        self.start == 1 && self.end.is_none()
    }

    fn slice(&self, content: &str) -> Result<String, ToolError> {
        let lines: Vec<&str> = content.lines().collect();
        if self.start > lines.len() {
            return Err(ToolError::InvalidParameters(format!(
                "startLine {} is past the end of the file ({} lines)",
                self.start,
                lines.len()
            )));
        }
        let end = self.end.unwrap_or(lines.len()).min(lines.len());
        Ok(lines[self.start - 1..end].join("\n"))
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a file inside the project. The path is relative to the project root and \
         cannot escape it. Use startLine/endLine (1-indexed, inclusive) to read a portion."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path relative to the project root"
                },
                "startLine": {
                    "type": "integer",
                    "description": "First line to return (1-indexed, optional)"
                },
                "endLine": {
                    "type": "integer",
                    "description": "Last line to return, inclusive (optional)"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let path = require_str(&params, "path")?;
        let range = LineRange::from_params(&params)?;

        let content = read_confined(&self.root, path, self.max_size).await?;
        if range.is_whole_file() {
            return Ok(ToolResult::text(content));
        }
        Ok(ToolResult::text(range.slice(&content)?))
    }
}
