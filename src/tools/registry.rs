//! Tool registry: built-in and plugin namespaces behind one merged view.
//!
//! Built-ins are constructed once per registry and never overridden. The
//! plugin namespace is rebuilt off to the side on every load and swapped in
//! whole, so readers see either the previous or the new set, never a
//! partially built one.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::config::ToolsConfig;
use crate::context::ToolContext;
use crate::error::ToolRegistrationError;
use crate::plugins::loader::{LoadResult, PluginLoader};
use crate::tools::builtin::builtin_tools;
use crate::tools::handlers::HandlerEnv;
use crate::tools::tool::{Tool, ToolResult};

/// Where a registered tool came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolSource {
    Builtin,
    Plugin,
}

/// Registry-facing metadata for one tool. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredToolInfo {
    pub name: String,
    pub description: String,
    pub source: ToolSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_name: Option<String>,
    pub input_schema: serde_json::Value,
}

/// Summary of one loaded plugin file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub source_file: PathBuf,
    pub tools: Vec<String>,
    pub loaded_at: DateTime<Utc>,
}

/// Outcome of `initialize` / `reload_plugins`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitResult {
    /// True only when no registration error was recorded.
    pub success: bool,
    pub tool_count: usize,
    pub errors: Vec<ToolRegistrationError>,
}

/// Callable handle for one tool. Never fails: every error becomes an error result.
#[derive(Debug, Clone)]
pub struct ToolHandler {
    tool: Arc<dyn Tool>,
}

impl ToolHandler {
    fn new(tool: Arc<dyn Tool>) -> Self {
        Self { tool }
    }

    pub fn name(&self) -> &str {
        self.tool.name()
    }

    /// Invoke the tool, folding errors and panics into the result.
    pub async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let name = self.tool.name();
        let outcome = AssertUnwindSafe(self.tool.execute(args, ctx))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(result)) => {
                if result.is_error() {
                    tracing::warn!(tool = %name, tool_use_id = %ctx.tool_use_id, "Tool returned an error result");
                }
                result
            }
            Ok(Err(e)) => {
                tracing::warn!(tool = %name, tool_use_id = %ctx.tool_use_id, error = %e, "Tool failed");
                ToolResult::from(e)
            }
            Err(_) => {
                tracing::error!(tool = %name, tool_use_id = %ctx.tool_use_id, "Tool panicked");
                ToolResult::error(format!("Tool {} failed unexpectedly", name))
            }
        }
    }
}

/// A tool as exposed to the agent runtime.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityTool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
    #[serde(skip)]
    pub handler: ToolHandler,
}

/// The merged tool set in the shape the agent runtime consumes.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityConfig {
    /// Server namespace the tools are published under.
    pub name: String,
    pub version: String,
    pub tools: Vec<CapabilityTool>,
}

#[derive(Debug, Clone)]
struct RegisteredTool {
    info: RegisteredToolInfo,
    tool: Arc<dyn Tool>,
}

impl RegisteredTool {
    fn new(tool: Arc<dyn Tool>, source: ToolSource, plugin_name: Option<String>) -> Self {
        let info = RegisteredToolInfo {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            source,
            plugin_name,
            input_schema: tool.parameters_schema(),
        };
        Self { info, tool }
    }
}

/// One complete plugin namespace, replaced wholesale on reload.
#[derive(Debug, Default)]
struct PluginSet {
    tools: HashMap<String, RegisteredTool>,
    plugins: Vec<PluginSummary>,
}

/// Registry of available tools.
pub struct ToolRegistry {
    config: ToolsConfig,
    loader: PluginLoader,
    builtins: OnceLock<HashMap<String, RegisteredTool>>,
    plugins: RwLock<Arc<PluginSet>>,
    /// Serializes plugin loads so two reloads cannot interleave their swaps.
    load_gate: Mutex<()>,
}

impl ToolRegistry {
    /// Create a registry. Nothing is registered until [`initialize`](Self::initialize).
    pub fn new(config: ToolsConfig) -> Self {
        let loader = PluginLoader::new(HandlerEnv::new(config.workspace_root.clone()));
        Self {
            config,
            loader,
            builtins: OnceLock::new(),
            plugins: RwLock::new(Arc::new(PluginSet::default())),
            load_gate: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ToolsConfig {
        &self.config
    }

    fn builtins(&self) -> &HashMap<String, RegisteredTool> {
        self.builtins.get_or_init(|| {
            builtin_tools(&self.config.workspace_root)
                .into_iter()
                .map(|tool| {
                    let registered = RegisteredTool::new(tool, ToolSource::Builtin, None);
                    tracing::debug!(tool = %registered.info.name, "Registered built-in tool");
                    (registered.info.name.clone(), registered)
                })
                .collect()
        })
    }

    /// Build the built-ins, then load and register plugin tools.
    pub async fn initialize(&self) -> InitResult {
        let builtin_count = self.builtins().len();
        tracing::info!(builtin_count, plugin_dir = %self.config.plugin_dir.display(), "Initializing tool registry");
        self.load_plugins().await
    }

    /// Discard and rebuild the plugin namespace. Built-ins are untouched.
    pub async fn reload_plugins(&self) -> InitResult {
        tracing::info!(plugin_dir = %self.config.plugin_dir.display(), "Reloading plugins");
        self.load_plugins().await
    }

    async fn load_plugins(&self) -> InitResult {
        let _gate = self.load_gate.lock().await;

        let loaded = self.loader.load(&self.config.plugin_dir).await;
        let (set, errors) = self.register_plugins(loaded);
        let plugin_count = set.tools.len();
        *self.plugins.write().await = Arc::new(set);

        let tool_count = self.builtins().len() + plugin_count;
        tracing::info!(tool_count, error_count = errors.len(), "Tool registry ready");
        InitResult {
            success: errors.is_empty(),
            tool_count,
            errors,
        }
    }

    /// Apply the conflict policy: built-ins always win, then the first plugin tool wins.
    fn register_plugins(&self, loaded: LoadResult) -> (PluginSet, Vec<ToolRegistrationError>) {
        let builtins = self.builtins();
        let loaded_at = loaded.loaded_at.unwrap_or_else(Utc::now);
        let mut errors = loaded.errors;
        let mut set = PluginSet::default();

        for plugin_tool in loaded.tools {
            let name = plugin_tool.tool.name().to_string();
            let source = plugin_tool.source_file.display().to_string();

            if builtins.contains_key(&name) {
                let error = ToolRegistrationError::new(
                    source,
                    Some(name.clone()),
                    format!(
                        "Plugin '{}' tool '{}' conflicts with a built-in tool and was not registered",
                        plugin_tool.plugin_name, name
                    ),
                );
                tracing::warn!(tool = %name, plugin = %plugin_tool.plugin_name, "Rejected tool registration: would shadow a built-in tool");
                errors.push(error);
                continue;
            }
            if let Some(existing) = set.tools.get(&name) {
                let error = ToolRegistrationError::new(
                    source,
                    Some(name.clone()),
                    format!(
                        "Plugin '{}' tool '{}' duplicates a tool already registered by plugin '{}'",
                        plugin_tool.plugin_name,
                        name,
                        existing.info.plugin_name.as_deref().unwrap_or("?")
                    ),
                );
                tracing::warn!(tool = %name, plugin = %plugin_tool.plugin_name, "Rejected tool registration: duplicate plugin tool name");
                errors.push(error);
                continue;
            }

            match set
                .plugins
                .iter_mut()
                .find(|p| p.source_file == plugin_tool.source_file)
            {
                Some(summary) => summary.tools.push(name.clone()),
                None => set.plugins.push(PluginSummary {
                    name: plugin_tool.plugin_name.clone(),
                    version: plugin_tool.plugin_version.clone(),
                    source_file: plugin_tool.source_file.clone(),
                    tools: vec![name.clone()],
                    loaded_at,
                }),
            }

            let registered = RegisteredTool::new(
                plugin_tool.tool,
                ToolSource::Plugin,
                Some(plugin_tool.plugin_name),
            );
            tracing::debug!(tool = %name, "Registered plugin tool");
            set.tools.insert(name, registered);
        }

        (set, errors)
    }

    async fn plugin_snapshot(&self) -> Arc<PluginSet> {
        Arc::clone(&*self.plugins.read().await)
    }

    /// All registered tools: built-ins first, then plugins, each sorted by name.
    async fn registered(&self) -> Vec<RegisteredTool> {
        let mut builtins: Vec<RegisteredTool> = self.builtins().values().cloned().collect();
        builtins.sort_by(|a, b| a.info.name.cmp(&b.info.name));

        let snapshot = self.plugin_snapshot().await;
        let mut plugins: Vec<RegisteredTool> = snapshot.tools.values().cloned().collect();
        plugins.sort_by(|a, b| a.info.name.cmp(&b.info.name));

        builtins.extend(plugins);
        builtins
    }

    async fn lookup(&self, name: &str) -> Option<RegisteredTool> {
        if let Some(tool) = self.builtins().get(name) {
            return Some(tool.clone());
        }
        self.plugin_snapshot().await.tools.get(name).cloned()
    }

    /// Metadata for every registered tool.
    pub async fn list_tools(&self) -> Vec<RegisteredToolInfo> {
        self.registered()
            .await
            .into_iter()
            .map(|registered| registered.info)
            .collect()
    }

    pub async fn get_tool_info(&self, name: &str) -> Option<RegisteredToolInfo> {
        self.lookup(name).await.map(|registered| registered.info)
    }

    pub async fn has_tool(&self, name: &str) -> bool {
        self.lookup(name).await.is_some()
    }

    /// Number of successfully registered tools.
    pub async fn tool_count(&self) -> usize {
        self.builtins().len() + self.plugin_snapshot().await.tools.len()
    }

    /// Plugins that contributed at least one registered tool.
    pub async fn list_plugins(&self) -> Vec<PluginSummary> {
        self.plugin_snapshot().await.plugins.clone()
    }

    /// Callable handle for a tool.
    pub async fn get_handler(&self, name: &str) -> Option<ToolHandler> {
        self.lookup(name)
            .await
            .map(|registered| ToolHandler::new(registered.tool))
    }

    /// Invoke a tool by name. Unknown names produce an error result.
    pub async fn invoke(&self, name: &str, args: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        match self.get_handler(name).await {
            Some(handler) => handler.call(args, ctx).await,
            None => ToolResult::error(format!("Unknown tool: {}", name)),
        }
    }

    /// Render every registered tool for the agent runtime.
    pub async fn to_capability_config(&self) -> CapabilityConfig {
        let tools = self
            .registered()
            .await
            .into_iter()
            .map(|registered| CapabilityTool {
                name: registered.info.name,
                description: registered.info.description,
                input_schema: registered.info.input_schema,
                handler: ToolHandler::new(registered.tool),
            })
            .collect();
        CapabilityConfig {
            name: self.config.server_namespace.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            tools,
        }
    }

    /// Fully qualified names (`<namespace>__<tool>`) for allow-listing.
    pub async fn allowed_tool_names(&self) -> Vec<String> {
        self.registered()
            .await
            .into_iter()
            .map(|registered| format!("{}__{}", self.config.server_namespace, registered.info.name))
            .collect()
    }
}
