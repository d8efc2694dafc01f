//! Plugin directory scanning.
//!
//! Each `*.json` file goes `read → parsed → validated → tools built`. A
//! failure at any step records one error for that file (or for that one tool)
//! and the scan moves on.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::fs;

use crate::error::{PluginError, ToolRegistrationError};
use crate::plugins::manifest::{parse_plugin_file, validate_tool};
use crate::tools::handlers::{HandlerEnv, build_tool};
use crate::tools::tool::Tool;

/// One executable tool produced from a plugin file.
#[derive(Debug, Clone)]
pub struct PluginTool {
    pub plugin_name: String,
    pub plugin_version: Option<String>,
    pub source_file: PathBuf,
    pub tool: Arc<dyn Tool>,
}

/// Everything one load pass produced.
#[derive(Debug, Default)]
pub struct LoadResult {
    pub tools: Vec<PluginTool>,
    pub errors: Vec<ToolRegistrationError>,
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Scans a plugin directory and builds tools with a shared handler environment.
#[derive(Debug, Clone)]
pub struct PluginLoader {
    env: HandlerEnv,
}

impl PluginLoader {
    pub fn new(env: HandlerEnv) -> Self {
        Self { env }
    }

    /// Load every plugin tool in `dir`.
    ///
    /// A missing directory (or a path that is not a directory) yields an
    /// empty result: plugins are optional.
    pub async fn load(&self, dir: &Path) -> LoadResult {
        let mut result = LoadResult {
            loaded_at: Some(Utc::now()),
            ..Default::default()
        };

        let is_dir = fs::metadata(dir).await.map(|m| m.is_dir()).unwrap_or(false);
        if !is_dir {
            tracing::debug!(dir = %dir.display(), "Plugin directory not present, skipping");
            return result;
        }

        let (files, listing_error) = list_plugin_files(dir).await;
        if let Some(e) = listing_error {
            result.errors.push(e.into_registration_error());
        }

        for path in files {
            match self.load_file(&path).await {
                Ok((tools, errors)) => {
                    result.tools.extend(tools);
                    result.errors.extend(errors);
                }
                Err(e) => result.errors.push(e.into_registration_error()),
            }
        }

        for error in &result.errors {
            tracing::warn!(source = %error.source, tool = ?error.tool_name, "{}", error.message);
        }
        tracing::info!(
            dir = %dir.display(),
            tool_count = result.tools.len(),
            error_count = result.errors.len(),
            "Loaded plugin tools"
        );
        result
    }

    /// Load one file. `Err` means the whole file was rejected.
    async fn load_file(
        &self,
        path: &Path,
    ) -> Result<(Vec<PluginTool>, Vec<ToolRegistrationError>), PluginError> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|source| PluginError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let file = parse_plugin_file(path, &text)?;

        let mut tools = Vec::new();
        let mut errors = Vec::new();
        for (index, raw) in file.tools.iter().enumerate() {
            let built = validate_tool(path, index, raw).and_then(|definition| {
                let name = definition.name.clone();
                build_tool(definition, &self.env).map_err(|e| PluginError::InvalidTool {
                    path: path.to_path_buf(),
                    tool: name,
                    message: e.to_string(),
                })
            });
            match built {
                Ok(tool) => tools.push(PluginTool {
                    plugin_name: file.name.clone(),
                    plugin_version: file.version.clone(),
                    source_file: path.to_path_buf(),
                    tool,
                }),
                Err(e) => errors.push(e.into_registration_error()),
            }
        }
        Ok((tools, errors))
    }
}

/// `*.json` regular files in `dir`, sorted by file name.
///
/// A listing failure is returned next to whatever files were found before it.
async fn list_plugin_files(dir: &Path) -> (Vec<PathBuf>, Option<PluginError>) {
    let io_error = |source| PluginError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let owned = dir.to_path_buf();
    let listed = tokio::task::spawn_blocking(move || {
        std::fs::read_dir(&owned)
            .map(|entries| json_candidates(entries.map(|entry| entry.map(|e| e.path()))))
    })
    .await;
    let (candidates, failure) = match listed {
        Ok(Ok(collected)) => collected,
        Ok(Err(source)) => return (Vec::new(), Some(io_error(source))),
        Err(join) => return (Vec::new(), Some(io_error(io::Error::other(join.to_string())))),
    };

    let mut files = Vec::new();
    for path in candidates {
        // Follows symlinks so a linked definition file is still picked up.
        if fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false) {
            files.push(path);
        }
    }
    files.sort();
    (files, failure.map(io_error))
}

/// Keep `*.json` paths, stopping at the first entry that cannot be read.
fn json_candidates(
    entries: impl IntoIterator<Item = io::Result<PathBuf>>,
) -> (Vec<PathBuf>, Option<io::Error>) {
    let mut candidates = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => {
                if path.extension().and_then(|e| e.to_str()) == Some("json") {
                    candidates.push(path);
                }
            }
            Err(e) => return (candidates, Some(e)),
        }
    }
    (candidates, None)
}

/// Load plugin tools from `dir` with a fresh handler environment rooted at `workspace_root`.
pub async fn load_plugin_tools(dir: &Path, workspace_root: &Path) -> LoadResult {
    PluginLoader::new(HandlerEnv::new(workspace_root.to_path_buf()))
        .load(dir)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_plugin(dir: &Path, file: &str, value: serde_json::Value) {
        std::fs::write(dir.join(file), serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn shell_tool(name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "description": "test tool",
            "inputSchema": {"type": "object"},
            "handler": {"type": "shell", "command": "echo ok"}
        })
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let result = load_plugin_tools(&dir.path().join("nope"), dir.path()).await;
        assert!(result.tools.is_empty());
        assert!(result.errors.is_empty());

        let file = dir.path().join("file.json");
        std::fs::write(&file, "{}").unwrap();
        let result = load_plugin_tools(&file, dir.path()).await;
        assert!(result.tools.is_empty() && result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_one_valid_one_invalid_file() {
        let dir = TempDir::new().unwrap();
        write_plugin(dir.path(), "good.json", json!({"name": "good", "tools": [shell_tool("ok_tool")]}));
        std::fs::write(dir.path().join("bad.json"), "{ this is not json").unwrap();

        let result = load_plugin_tools(dir.path(), dir.path()).await;
        assert_eq!(result.tools.len(), 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].source.ends_with("bad.json"));
        assert!(result.errors[0].tool_name.is_none());
    }

    #[tokio::test]
    async fn test_non_json_files_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("README.md"), "# plugins").unwrap();
        std::fs::write(dir.path().join("notes.json.bak"), "garbage").unwrap();
        std::fs::create_dir(dir.path().join("sub.json")).unwrap();

        let result = load_plugin_tools(dir.path(), dir.path()).await;
        assert!(result.tools.is_empty());
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_bad_tool_isolated_within_file() {
        let dir = TempDir::new().unwrap();
        write_plugin(
            dir.path(),
            "mixed.json",
            json!({
                "name": "mixed",
                "version": "2.0.0",
                "tools": [
                    shell_tool("first"),
                    {"name": "broken", "description": "x", "inputSchema": {}, "handler": {"type": "smtp"}},
                    {"name": "escape", "description": "x", "inputSchema": {},
                     "handler": {"type": "shell", "command": "ls", "cwd": "../../.."}},
                    shell_tool("second")
                ]
            }),
        );

        let result = load_plugin_tools(dir.path(), dir.path()).await;
        let names: Vec<&str> = result.tools.iter().map(|t| t.tool.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(result.tools.iter().all(|t| t.plugin_name == "mixed"));
        assert_eq!(result.tools[0].plugin_version.as_deref(), Some("2.0.0"));

        let failed: Vec<_> = result.errors.iter().filter_map(|e| e.tool_name.as_deref()).collect();
        assert_eq!(failed, vec!["broken", "escape"]);
    }

    #[test]
    fn test_entry_failure_keeps_earlier_files() {
        let entries = vec![
            Ok(PathBuf::from("/plugins/a.json")),
            Ok(PathBuf::from("/plugins/README.md")),
            Ok(PathBuf::from("/plugins/b.json")),
            Err(io::Error::other("stale directory entry")),
            Ok(PathBuf::from("/plugins/c.json")),
        ];
        let (candidates, failure) = json_candidates(entries);
        assert_eq!(
            candidates,
            vec![PathBuf::from("/plugins/a.json"), PathBuf::from("/plugins/b.json")]
        );
        assert_eq!(failure.unwrap().to_string(), "stale directory entry");
    }

    #[tokio::test]
    async fn test_listing_error_reported_with_files() {
        let dir = TempDir::new().unwrap();
        write_plugin(dir.path(), "a.json", json!({"name": "a", "tools": [shell_tool("from_a")]}));

        let (files, failure) = list_plugin_files(dir.path()).await;
        assert_eq!(files, vec![dir.path().join("a.json")]);
        assert!(failure.is_none());

        let (files, failure) = list_plugin_files(&dir.path().join("a.json")).await;
        assert!(files.is_empty());
        assert!(matches!(failure, Some(PluginError::Io { .. })));
    }

    #[tokio::test]
    async fn test_files_loaded_in_name_order() {
        let dir = TempDir::new().unwrap();
        write_plugin(dir.path(), "b.json", json!({"name": "b", "tools": [shell_tool("from_b")]}));
        write_plugin(dir.path(), "a.json", json!({"name": "a", "tools": [shell_tool("from_a")]}));

        let result = load_plugin_tools(dir.path(), dir.path()).await;
        let plugins: Vec<&str> = result.tools.iter().map(|t| t.plugin_name.as_str()).collect();
        assert_eq!(plugins, vec!["a", "b"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_file_reported() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locked.json");
        std::fs::write(&path, r#"{"name": "locked", "tools": []}"#).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores permission bits; only assert when the read actually fails.
        if std::fs::read_to_string(&path).is_ok() {
            return;
        }
        let result = load_plugin_tools(dir.path(), dir.path()).await;
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("Failed to read"));
    }
}
