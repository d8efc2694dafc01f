//! Integration tests for the tool registry.
//!
//! Each test writes plugin definition files into a temporary directory and
//! drives the registry through its public API only.

use std::path::Path;
use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;

use ai_tools::config::ToolsConfig;
use ai_tools::context::ToolContext;
use ai_tools::plugins::load_plugin_tools;
use ai_tools::tools::{ToolRegistry, ToolSource};

const BUILTINS: [&str; 4] = ["read_file", "workspace_changes", "workspace_info", "workspace_status"];

struct Fixture {
    workspace: TempDir,
    plugins: TempDir,
    registry: ToolRegistry,
}

fn fixture() -> Fixture {
    let workspace = TempDir::new().unwrap();
    let plugins = TempDir::new().unwrap();
    let config = ToolsConfig::new(workspace.path())
        .with_plugin_dir(plugins.path())
        .with_namespace("workspace-tools");
    Fixture {
        registry: ToolRegistry::new(config),
        workspace,
        plugins,
    }
}

fn write_plugin(dir: &Path, file: &str, name: &str, tools: Value) {
    let body = json!({"name": name, "version": "0.1.0", "tools": tools});
    std::fs::write(dir.join(file), serde_json::to_string_pretty(&body).unwrap()).unwrap();
}

fn echo_tool(name: &str) -> Value {
    json!({
        "name": name,
        "description": "Echo a message",
        "inputSchema": {
            "type": "object",
            "properties": {"msg": {"type": "string"}},
            "required": ["msg"]
        },
        "handler": {"type": "shell", "command": "echo {{msg}}"}
    })
}

#[tokio::test]
async fn shell_plugin_echoes_message() {
    let f = fixture();
    write_plugin(f.plugins.path(), "echo.json", "echo", json!([echo_tool("echo")]));

    let init = f.registry.initialize().await;
    assert!(init.success, "{:?}", init.errors);

    let ctx = ToolContext::default();
    let result = f.registry.invoke("echo", json!({"msg": "hi there"}), &ctx).await;
    assert!(!result.is_error());
    assert!(result.text_content().contains("hi there"));
}

#[tokio::test]
async fn shell_plugin_does_not_interpret_metacharacters() {
    let f = fixture();
    write_plugin(f.plugins.path(), "echo.json", "echo", json!([echo_tool("echo")]));
    f.registry.initialize().await;

    let marker = f.workspace.path().join("pwned");
    let msg = format!("x; touch {}", marker.display());
    let ctx = ToolContext::default();
    let result = f.registry.invoke("echo", json!({"msg": msg}), &ctx).await;

    assert!(!result.is_error());
    assert!(result.text_content().contains("; touch"));
    assert!(!marker.exists());
}

#[tokio::test]
async fn file_read_plugin_rejects_traversal() {
    let f = fixture();
    write_plugin(
        f.plugins.path(),
        "reader.json",
        "reader",
        json!([{
            "name": "read_x",
            "description": "Read from /tmp/x",
            "inputSchema": {"type": "object", "properties": {"path": {"type": "string"}}},
            "handler": {"type": "file-read", "basePath": "/tmp/x"}
        }]),
    );
    f.registry.initialize().await;

    let ctx = ToolContext::default();
    let result = f
        .registry
        .invoke("read_x", json!({"path": "../../etc/passwd"}), &ctx)
        .await;
    assert!(result.is_error());
    assert!(result.text_content().contains("traversal"));
}

#[tokio::test]
async fn file_read_plugin_reads_inside_base() {
    let f = fixture();
    let base = f.workspace.path().join("docs");
    std::fs::create_dir(&base).unwrap();
    std::fs::write(base.join("notes.txt"), "release on friday").unwrap();
    write_plugin(
        f.plugins.path(),
        "docs.json",
        "docs",
        json!([{
            "name": "read_doc",
            "description": "Read a document",
            "inputSchema": {"type": "object"},
            "handler": {"type": "file-read", "basePath": base.to_string_lossy()}
        }]),
    );
    f.registry.initialize().await;

    let ctx = ToolContext::default();
    let result = f.registry.invoke("read_doc", json!({"path": "notes.txt"}), &ctx).await;
    assert_eq!(result.text_content(), "release on friday");
}

#[tokio::test]
async fn one_valid_one_malformed_file() {
    let f = fixture();
    write_plugin(f.plugins.path(), "good.json", "good", json!([echo_tool("good_tool")]));
    std::fs::write(f.plugins.path().join("bad.json"), "{\"name\": \"bad\", \"tools\": [").unwrap();

    let loaded = load_plugin_tools(f.plugins.path(), f.workspace.path()).await;
    assert_eq!(loaded.tools.len(), 1);
    assert_eq!(loaded.errors.len(), 1);

    let init = f.registry.initialize().await;
    assert!(!init.success);
    assert_eq!(init.errors.len(), 1);
    assert_eq!(init.tool_count, BUILTINS.len() + 1);
}

#[tokio::test]
async fn duplicate_names_register_once() {
    let f = fixture();
    write_plugin(
        f.plugins.path(),
        "a.json",
        "a",
        json!([echo_tool("shared"), echo_tool("workspace_status")]),
    );
    write_plugin(f.plugins.path(), "b.json", "b", json!([echo_tool("shared")]));

    let init = f.registry.initialize().await;
    assert_eq!(init.errors.len(), 2);
    assert_eq!(f.registry.tool_count().await, BUILTINS.len() + 1);

    let names: Vec<String> = f.registry.list_tools().await.into_iter().map(|t| t.name).collect();
    assert_eq!(names.iter().filter(|n| *n == "shared").count(), 1);
    assert_eq!(names.iter().filter(|n| *n == "workspace_status").count(), 1);

    let status = f.registry.get_tool_info("workspace_status").await.unwrap();
    assert_eq!(status.source, ToolSource::Builtin);
    let shared = f.registry.get_tool_info("shared").await.unwrap();
    assert_eq!(shared.plugin_name.as_deref(), Some("a"));
}

#[tokio::test]
async fn reload_drops_deleted_plugins_and_keeps_builtins() {
    let f = fixture();
    write_plugin(f.plugins.path(), "keep.json", "keep", json!([echo_tool("kept")]));
    write_plugin(f.plugins.path(), "gone.json", "gone", json!([echo_tool("removed")]));
    f.registry.initialize().await;
    let builtins_before: Vec<_> = f
        .registry
        .list_tools()
        .await
        .into_iter()
        .filter(|t| t.source == ToolSource::Builtin)
        .collect();

    std::fs::remove_file(f.plugins.path().join("gone.json")).unwrap();
    let reload = f.registry.reload_plugins().await;

    assert!(reload.success);
    assert!(f.registry.has_tool("kept").await);
    assert!(!f.registry.has_tool("removed").await);
    let builtins_after: Vec<_> = f
        .registry
        .list_tools()
        .await
        .into_iter()
        .filter(|t| t.source == ToolSource::Builtin)
        .collect();
    assert_eq!(builtins_before, builtins_after);

    let plugins = f.registry.list_plugins().await;
    assert_eq!(plugins.len(), 1);
    assert_eq!(plugins[0].name, "keep");
    assert_eq!(plugins[0].version.as_deref(), Some("0.1.0"));
}

#[tokio::test]
async fn concurrent_reads_during_reload_see_complete_sets() {
    let f = fixture();
    write_plugin(
        f.plugins.path(),
        "many.json",
        "many",
        json!((0..20).map(|i| echo_tool(&format!("tool_{i:02}"))).collect::<Vec<_>>()),
    );
    f.registry.initialize().await;

    let registry = Arc::new(f.registry);
    let readers: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                for _ in 0..20 {
                    let count = registry.list_tools().await.len();
                    assert_eq!(count, BUILTINS.len() + 20);
                }
            })
        })
        .collect();
    for _ in 0..5 {
        registry.reload_plugins().await;
    }
    for reader in readers {
        reader.await.unwrap();
    }
}

#[tokio::test]
async fn capability_config_and_allowed_names() {
    let f = fixture();
    write_plugin(f.plugins.path(), "echo.json", "echo", json!([echo_tool("echo")]));
    f.registry.initialize().await;

    let allowed = f.registry.allowed_tool_names().await;
    assert_eq!(allowed.len(), BUILTINS.len() + 1);
    for name in BUILTINS.iter().chain(["echo"].iter()) {
        assert!(allowed.contains(&format!("workspace-tools__{name}")), "{name}");
    }

    let capabilities = f.registry.to_capability_config().await;
    assert_eq!(capabilities.name, "workspace-tools");
    assert_eq!(capabilities.version, env!("CARGO_PKG_VERSION"));
    let echo = capabilities.tools.iter().find(|t| t.name == "echo").unwrap();
    assert_eq!(echo.input_schema["required"], json!(["msg"]));

    let ctx = ToolContext::default();
    let result = echo.handler.call(json!({"msg": "via capability"}), &ctx).await;
    assert!(result.text_content().contains("via capability"));

    let serialized = serde_json::to_value(&capabilities).unwrap();
    assert!(serialized["tools"][0].get("inputSchema").is_some());
    assert!(serialized["tools"][0].get("handler").is_none());
}

#[tokio::test]
async fn read_file_builtin_is_confined_to_workspace() {
    let f = fixture();
    std::fs::write(f.workspace.path().join("a.txt"), "one\ntwo\nthree\n").unwrap();
    f.registry.initialize().await;

    let ctx = ToolContext::default();
    let ok = f
        .registry
        .invoke("read_file", json!({"path": "a.txt", "startLine": 2, "endLine": 2}), &ctx)
        .await;
    assert!(!ok.is_error());
    assert!(ok.text_content().contains("two"));
    assert!(!ok.text_content().contains("three"));

    let escaped = f
        .registry
        .invoke("read_file", json!({"path": "../outside.txt"}), &ctx)
        .await;
    assert!(escaped.is_error());
}
