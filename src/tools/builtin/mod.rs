//! Built-in tools: workspace introspection and the project file reader.

pub mod file;
pub mod workspace;

use std::path::Path;
use std::sync::Arc;

use crate::tools::tool::Tool;

pub use file::ReadFileTool;
pub use workspace::{WorkspaceChangesTool, WorkspaceInfoTool, WorkspaceStatusTool};

/// Construct every built-in tool for the given workspace root.
pub fn builtin_tools(workspace_root: &Path) -> Vec<Arc<dyn Tool>> {
    let root = workspace_root.to_path_buf();
    vec![
        Arc::new(WorkspaceStatusTool::new(root.clone())),
        Arc::new(WorkspaceChangesTool::new(root.clone())),
        Arc::new(WorkspaceInfoTool::new(root.clone())),
        Arc::new(ReadFileTool::new(root)),
    ]
}
