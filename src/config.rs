//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Namespace used for fully-qualified tool names when none is configured.
pub const DEFAULT_NAMESPACE: &str = "workspace-tools";

/// Environment variable overriding the plugin directory.
pub const PLUGIN_DIR_ENV: &str = "AI_TOOLS_PLUGIN_DIR";

/// Environment variable overriding the workspace root.
pub const WORKSPACE_ENV: &str = "AI_TOOLS_WORKSPACE";

/// Environment variable overriding the server namespace.
pub const NAMESPACE_ENV: &str = "AI_TOOLS_NAMESPACE";

/// Registry configuration.
#[derive(Debug, Clone)]
pub struct ToolsConfig {
    /// Workspace the built-in tools inspect; shell `cwd` values are confined to it.
    pub workspace_root: PathBuf,
    /// Directory scanned for `*.json` plugin definitions.
    pub plugin_dir: PathBuf,
    /// Prefix for allow-listed tool names (`<namespace>__<tool>`).
    pub server_namespace: String,
}

impl ToolsConfig {
    /// Configuration for a workspace with default plugin directory and namespace.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            plugin_dir: default_plugin_dir(),
            server_namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    pub fn with_plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugin_dir = dir.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.server_namespace = namespace.into();
        self
    }

    /// Build from `AI_TOOLS_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let workspace_root = match std::env::var(WORKSPACE_ENV) {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => std::env::current_dir()?,
        };

        let plugin_dir = std::env::var(PLUGIN_DIR_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_plugin_dir);

        let server_namespace =
            std::env::var(NAMESPACE_ENV).unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string());

        let config = Self {
            workspace_root,
            plugin_dir,
            server_namespace,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that the registry relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_namespace.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: NAMESPACE_ENV.to_string(),
                message: "namespace must not be empty".to_string(),
            });
        }
        if self.server_namespace.contains("__") {
            return Err(ConfigError::InvalidValue {
                key: NAMESPACE_ENV.to_string(),
                message: "namespace must not contain '__'".to_string(),
            });
        }
        if !self.workspace_root.is_dir() {
            return Err(ConfigError::InvalidValue {
                key: WORKSPACE_ENV.to_string(),
                message: format!("{} is not a directory", self.workspace_root.display()),
            });
        }
        Ok(())
    }
}

impl Default for ToolsConfig {
    /// The current directory as workspace, with default plugin directory and namespace.
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

/// Default plugin directory under the user's config area.
pub fn default_plugin_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("ai-tools").join("plugins"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".ai-tools/plugins")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builder_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ToolsConfig::new(dir.path());
        assert_eq!(config.server_namespace, DEFAULT_NAMESPACE);
        assert!(config.plugin_dir.ends_with("plugins"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_uses_current_dir() {
        let config = ToolsConfig::default();
        assert_eq!(config.workspace_root, std::env::current_dir().unwrap());
        assert_eq!(config.plugin_dir, default_plugin_dir());
        assert_eq!(config.server_namespace, DEFAULT_NAMESPACE);
    }

    #[test]
    fn test_validate_namespace() {
        let dir = TempDir::new().unwrap();
        assert!(ToolsConfig::new(dir.path()).with_namespace("").validate().is_err());
        assert!(ToolsConfig::new(dir.path()).with_namespace("a__b").validate().is_err());
        assert!(ToolsConfig::new(dir.path()).with_namespace("ide").validate().is_ok());
    }

    #[test]
    fn test_validate_workspace_must_exist() {
        let dir = TempDir::new().unwrap();
        let config = ToolsConfig::new(dir.path().join("missing"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
