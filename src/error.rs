//! Error types for AI Tools.

use std::fmt;
use std::path::PathBuf;

pub use crate::tools::interpolate::InterpolationError;
pub use crate::tools::tool::ToolError;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure loading one plugin file, or one tool inside it.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Schema violation in {}: {message}", path.display())]
    Schema { path: PathBuf, message: String },

    #[error("Invalid tool {tool} in {}: {message}", path.display())]
    InvalidTool {
        path: PathBuf,
        tool: String,
        message: String,
    },
}

impl PluginError {
    /// Flatten into the accumulated registration error form.
    pub fn into_registration_error(self) -> ToolRegistrationError {
        let (source, tool_name) = match &self {
            PluginError::Io { path, .. }
            | PluginError::Json { path, .. }
            | PluginError::Schema { path, .. } => (path.display().to_string(), None),
            PluginError::InvalidTool { path, tool, .. } => {
                (path.display().to_string(), Some(tool.clone()))
            }
        };
        ToolRegistrationError {
            source,
            tool_name,
            message: self.to_string(),
        }
    }
}

/// A tool (or whole plugin file) that was excluded from the registry.
///
/// These are collected, never returned as `Err`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRegistrationError {
    /// Plugin file path or plugin name the error is scoped to.
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    pub message: String,
}

impl ToolRegistrationError {
    pub fn new(source: impl Into<String>, tool_name: Option<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            tool_name,
            message: message.into(),
        }
    }
}

impl fmt::Display for ToolRegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tool_name {
            Some(tool) => write!(f, "{} [{}]: {}", self.source, tool, self.message),
            None => write!(f, "{}: {}", self.source, self.message),
        }
    }
}

impl std::error::Error for ToolRegistrationError {}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
