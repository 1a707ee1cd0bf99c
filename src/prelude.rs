//! Convenience re-exports for common use.

pub use crate::config::{AgentConfig, SettingsStore};
pub use crate::error::{AgentError, Result};
pub use crate::mcp::{
    ConnectionStatus, DesiredState, MCPConnectionController, ServerConfig, SettingsServerStore,
    StatusSnapshot, StreamableHttpConnector, TransitionOutcome,
};
pub use crate::tools::{HostTool, ToolArguments, ToolDefinition, ToolRegistry, ToolResult};
