//! MCP transport boundary.
//!
//! A connector opens one session per connection attempt. Sessions are shared
//! (`Arc`) between the lifecycle controller and every adapted tool's executor.

use std::sync::Arc;

use async_trait::async_trait;

use super::schema::{MCPToolCallResult, RemoteToolDescriptor};
use super::server::ServerConfig;
use crate::error::AgentError;

/// An open connection to one MCP server.
#[async_trait]
pub trait MCPSession: Send + Sync {
    /// List every tool the server advertises.
    async fn list_tools(&self) -> Result<Vec<RemoteToolDescriptor>, AgentError>;

    /// Invoke a tool by name.
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<MCPToolCallResult, AgentError>;

    /// Close the session. Idempotent; closing a closed session is `Ok(())`.
    async fn close(&self) -> Result<(), AgentError>;
}

/// Opens sessions to configured servers.
#[async_trait]
pub trait MCPConnector: Send + Sync {
    async fn open(&self, config: &ServerConfig) -> Result<Arc<dyn MCPSession>, AgentError>;
}
