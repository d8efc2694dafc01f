//! Plugin definition files and their validation.
//!
//! A file is parsed in two stages: the envelope (`name`, `version`, `tools`)
//! first, then every tool entry on its own. A malformed tool is rejected
//! without affecting its siblings.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::PluginError;
use crate::tools::handlers::{HandlerConfig, ToolDefinition};

/// Tool identifiers: letters, digits, `_` and `-`, no whitespace.
static TOOL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("tool name regex is valid"));

const HANDLER_TYPES: &[&str] = &["shell", "http", "file-read"];

/// The envelope of a plugin file. Tool entries stay raw until validated one by one.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginConfigFile {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    pub tools: Vec<serde_json::Value>,
}

/// Parse the file envelope.
pub fn parse_plugin_file(path: &Path, text: &str) -> Result<PluginConfigFile, PluginError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|source| PluginError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let schema = |message: String| PluginError::Schema {
        path: path.to_path_buf(),
        message,
    };
    if !value.is_object() {
        return Err(schema("top level must be an object".to_string()));
    }
    let file: PluginConfigFile =
        serde_json::from_value(value).map_err(|e| schema(e.to_string()))?;
    if file.name.trim().is_empty() {
        return Err(schema("plugin name must not be empty".to_string()));
    }
    Ok(file)
}

/// Validate one raw tool entry into a [`ToolDefinition`].
pub fn validate_tool(path: &Path, index: usize, raw: &serde_json::Value) -> Result<ToolDefinition, PluginError> {
    let label = raw
        .get("name")
        .and_then(|n| n.as_str())
        .map(String::from)
        .unwrap_or_else(|| format!("#{}", index));
    let invalid = |message: String| PluginError::InvalidTool {
        path: path.to_path_buf(),
        tool: label.clone(),
        message,
    };

    let Some(entry) = raw.as_object() else {
        return Err(invalid("tool entry must be an object".to_string()));
    };

    let name = match entry.get("name").and_then(|v| v.as_str()) {
        Some(name) if TOOL_NAME.is_match(name) => name.to_string(),
        Some(name) => {
            return Err(invalid(format!(
                "name '{}' must match [A-Za-z0-9_-]{{1,64}}",
                name
            )));
        }
        None => return Err(invalid("missing string field 'name'".to_string())),
    };

    let description = match entry.get("description").and_then(|v| v.as_str()) {
        Some(d) if !d.trim().is_empty() => d.to_string(),
        _ => return Err(invalid("missing or empty 'description'".to_string())),
    };

    let input_schema = match entry.get("inputSchema") {
        Some(schema) if schema.is_object() => {
            match schema.get("type").and_then(|t| t.as_str()) {
                None | Some("object") => schema.clone(),
                Some(other) => {
                    return Err(invalid(format!(
                        "inputSchema type must be 'object', got '{}'",
                        other
                    )));
                }
            }
        }
        Some(_) => return Err(invalid("'inputSchema' must be an object".to_string())),
        None => return Err(invalid("missing 'inputSchema'".to_string())),
    };

    let handler = match entry.get("handler") {
        None => return Err(invalid("missing 'handler'".to_string())),
        Some(raw_handler) => {
            let kind = raw_handler.get("type").and_then(|t| t.as_str());
            match kind {
                Some(kind) if HANDLER_TYPES.contains(&kind) => {
                    serde_json::from_value::<HandlerConfig>(raw_handler.clone())
                        .map_err(|e| invalid(format!("invalid {} handler: {}", kind, e)))?
                }
                Some(kind) => {
                    return Err(invalid(format!("unrecognized handler type '{}'", kind)));
                }
                None => return Err(invalid("handler is missing 'type'".to_string())),
            }
        }
    };

    Ok(ToolDefinition {
        name,
        description,
        input_schema,
        handler,
    })
}
