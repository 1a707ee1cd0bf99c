//! Host-native tool representation.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use super::arguments::ToolArguments;
use super::types::{ToolDefinition, ToolResult};
use crate::error::AgentError;

/// Where a registered tool came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolSource {
    /// Compiled into the host.
    Builtin,
    /// Discovered on an MCP server during connection attempt `generation`.
    Mcp { server_id: String, generation: u64 },
}

impl ToolSource {
    pub fn is_mcp(&self) -> bool {
        matches!(self, Self::Mcp { .. })
    }

    pub fn server_id(&self) -> Option<&str> {
        match self {
            Self::Mcp { server_id, .. } => Some(server_id),
            Self::Builtin => None,
        }
    }
}

type ToolHandler =
    dyn Fn(ToolArguments) -> BoxFuture<'static, Result<serde_json::Value, AgentError>> + Send + Sync;

/// A callable capability: a function-calling definition plus its executor.
pub struct HostTool {
    definition: ToolDefinition,
    source: ToolSource,
    handler: Arc<ToolHandler>,
}

impl HostTool {
    /// Create a tool from a closure.
    ///
    /// The closure may fail; [`HostTool::execute`] folds the error into a
    /// failed [`ToolResult`].
    pub fn new<F, Fut>(definition: ToolDefinition, source: ToolSource, handler: F) -> Self
    where
        F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, AgentError>> + Send + 'static,
    {
        Self {
            definition,
            source,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    /// Tool name (must match what the model calls).
    pub fn name(&self) -> &str {
        &self.definition.function.name
    }

    pub fn description(&self) -> &str {
        &self.definition.function.description
    }

    pub fn parameters(&self) -> &serde_json::Value {
        &self.definition.function.parameters
    }

    pub fn source(&self) -> &ToolSource {
        &self.source
    }

    /// Run the tool. Never fails: errors come back as `success == false`.
    pub async fn execute(&self, args: ToolArguments) -> ToolResult {
        match (self.handler)(args).await {
            Ok(value) => ToolResult::ok(value),
            Err(e) => {
                tracing::debug!(tool = %self.name(), error = %e, "Tool call failed");
                ToolResult::failure(e.user_message())
            }
        }
    }
}

impl std::fmt::Debug for HostTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostTool")
            .field("name", &self.name())
            .field("description", &self.description())
            .field("source", &self.source)
            .finish()
    }
}
