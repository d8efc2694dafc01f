//! File-read strategy: bounded reads confined to a base directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::context::ToolContext;
use crate::tools::handlers::{FileReadConfig, Handler, HandlerBuildError};
use crate::tools::sandbox::resolve_confined;
use crate::tools::tool::{ToolError, ToolResult, require_str};

/// Maximum file size for reading (1MB).
pub const DEFAULT_MAX_SIZE: u64 = 1024 * 1024;

/// Resolve `relative` inside `base` and read it, refusing files over `max_size`.
///
/// The size is checked from metadata before any content is loaded.
pub async fn read_confined(base: &Path, relative: &str, max_size: u64) -> Result<String, ToolError> {
    let path = resolve_confined(base, relative)?;

    let metadata = fs::metadata(&path)
        .await
        .map_err(|e| ToolError::ExecutionFailed(format!("Cannot access file {}: {}", relative, e)))?;
    if !metadata.is_file() {
        return Err(ToolError::ExecutionFailed(format!("Not a regular file: {}", relative)));
    }
    if metadata.len() > max_size {
        return Err(ToolError::FileTooLarge {
            size: metadata.len(),
            max: max_size,
        });
    }

    let bytes = fs::read(&path)
        .await
        .map_err(|e| ToolError::ExecutionFailed(format!("Failed to read file {}: {}", relative, e)))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads files under a fixed base directory.
#[derive(Debug)]
pub struct FileReadHandler {
    base_path: PathBuf,
    max_size: u64,
}

impl FileReadHandler {
    pub fn new(config: &FileReadConfig) -> Result<Self, HandlerBuildError> {
        let base_path = PathBuf::from(&config.base_path);
        if !base_path.is_absolute() {
            return Err(HandlerBuildError::invalid(
                "file-read",
                format!("basePath must be absolute, got '{}'", config.base_path),
            ));
        }
        Ok(Self {
            base_path,
            max_size: config.max_size.unwrap_or(DEFAULT_MAX_SIZE),
        })
    }
}

#[async_trait]
impl Handler for FileReadHandler {
    async fn run(
        &self,
        args: &serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let relative = require_str(args, "path")?;
        let content = read_confined(&self.base_path, relative, self.max_size).await?;
        Ok(ToolResult::text(content))
    }
}
