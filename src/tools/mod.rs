//! Tool abstraction, execution strategies and the registry.

pub mod builtin;
pub mod handlers;
pub mod interpolate;
pub mod registry;
pub mod sandbox;
pub mod tool;

pub use handlers::{HandlerConfig, ToolDefinition, build_tool};
pub use registry::{
    CapabilityConfig, CapabilityTool, InitResult, PluginSummary, RegisteredToolInfo, ToolHandler,
    ToolRegistry, ToolSource,
};
pub use tool::*;
