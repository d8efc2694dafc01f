//! Declarative tool definitions and the three execution strategies behind them.
//!
//! A [`ToolDefinition`] names a tool and carries exactly one [`HandlerConfig`].
//! [`build_tool`] matches on the config and wraps the matching strategy in a
//! [`DefinedTool`], so adding a handler kind is a compile error until every
//! match handles it.

pub mod file_read;
pub mod http;
pub mod shell;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::ToolContext;
use crate::tools::tool::{Tool, ToolError, ToolResult};

pub use file_read::FileReadHandler;
pub use http::HttpHandler;
pub use shell::ShellHandler;

/// Shell strategy settings. `timeout` is in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// HTTP strategy settings. `timeout` is in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// File-read strategy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReadConfig {
    pub base_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
}

/// Which strategy backs a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HandlerConfig {
    Shell(ShellConfig),
    Http(HttpConfig),
    FileRead(FileReadConfig),
}

impl HandlerConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerConfig::Shell(_) => "shell",
            HandlerConfig::Http(_) => "http",
            HandlerConfig::FileRead(_) => "file-read",
        }
    }
}

/// Declarative source for one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
    pub handler: HandlerConfig,
}

/// Error building a strategy from its config.
#[derive(Debug, thiserror::Error)]
pub enum HandlerBuildError {
    #[error("invalid {kind} handler: {message}")]
    Invalid { kind: &'static str, message: String },
}

impl HandlerBuildError {
    pub(crate) fn invalid(kind: &'static str, message: impl Into<String>) -> Self {
        HandlerBuildError::Invalid {
            kind,
            message: message.into(),
        }
    }
}

/// Static environment shared by every strategy built in one load pass.
#[derive(Debug, Clone)]
pub struct HandlerEnv {
    /// Root that shell `cwd` values are confined to.
    pub workspace_root: PathBuf,
    pub http_client: reqwest::Client,
}

impl HandlerEnv {
    pub fn new(workspace_root: PathBuf) -> Self {
        Self {
            workspace_root,
            http_client: reqwest::Client::new(),
        }
    }
}

/// A single execution strategy over its static config.
#[async_trait]
pub trait Handler: Send + Sync + std::fmt::Debug {
    async fn run(
        &self,
        args: &serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError>;
}

/// A tool assembled from a [`ToolDefinition`] and its strategy.
#[derive(Debug)]
pub struct DefinedTool {
    definition: ToolDefinition,
    handler: Box<dyn Handler>,
}

impl DefinedTool {
    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }
}

#[async_trait]
impl Tool for DefinedTool {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn description(&self) -> &str {
        &self.definition.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        self.definition.input_schema.clone()
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        self.handler.run(&params, ctx).await
    }
}

/// Build an executable tool from its definition.
pub fn build_tool(
    definition: ToolDefinition,
    env: &HandlerEnv,
) -> Result<Arc<dyn Tool>, HandlerBuildError> {
    let handler: Box<dyn Handler> = match &definition.handler {
        HandlerConfig::Shell(config) => Box::new(ShellHandler::new(config, &env.workspace_root)?),
        HandlerConfig::Http(config) => Box::new(HttpHandler::new(config, env.http_client.clone())?),
        HandlerConfig::FileRead(config) => Box::new(FileReadHandler::new(config)?),
    };
    tracing::debug!(
        tool = %definition.name,
        kind = definition.handler.kind(),
        "Built tool handler"
    );
    Ok(Arc::new(DefinedTool {
        definition,
        handler,
    }))
}
