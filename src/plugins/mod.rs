//! Plugin tool definitions loaded from a directory of JSON files.

pub mod loader;
pub mod manifest;

pub use loader::{LoadResult, PluginLoader, PluginTool, load_plugin_tools};
pub use manifest::{PluginConfigFile, parse_plugin_file, validate_tool};
