//! AI Tools: sandboxed tool registry for agent runtimes.

pub mod config;
pub mod context;
pub mod error;
pub mod plugins;
pub mod tools;

pub use config::ToolsConfig;
pub use context::ToolContext;
pub use tools::ToolRegistry;
