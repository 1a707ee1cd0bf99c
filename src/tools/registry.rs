//! Shared name-to-tool registry read by the conversation engine.

use std::sync::{Arc, PoisonError, RwLock};

use super::arguments::ToolArguments;
use super::tool::HostTool;
use super::types::{ToolDefinition, ToolResult};

/// Registry of host tools keyed by function name.
///
/// Entries keep the position of their first registration, so the tool list
/// handed to the model is stable across re-registration. Writes replace whole
/// `Arc<HostTool>` entries; readers never see a partially built tool.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: RwLock<Vec<Arc<HostTool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with `tools`.
    pub fn with_tools(tools: impl IntoIterator<Item = HostTool>) -> Self {
        let registry = Self::new();
        for tool in tools {
            registry.register_tool(tool);
        }
        registry
    }

    /// Insert a tool, overwriting any tool with the same name in place.
    pub fn register_tool(&self, tool: HostTool) {
        let tool = Arc::new(tool);
        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        match tools.iter().position(|t| t.name() == tool.name()) {
            Some(index) => tools[index] = tool,
            None => tools.push(tool),
        }
    }

    /// Snapshot of all registered tools.
    pub fn list_tools(&self) -> Vec<Arc<HostTool>> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Function-calling definitions for the model's tool context.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|tool| tool.definition().clone())
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|tool| tool.name().to_string())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<HostTool>> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|tool| tool.name() == name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove every tool matching `predicate`; returns how many were removed.
    pub fn unregister_all(&self, predicate: impl Fn(&HostTool) -> bool) -> usize {
        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        let before = tools.len();
        tools.retain(|tool| !predicate(tool));
        before - tools.len()
    }

    pub fn len(&self) -> usize {
        self.tools.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispatch a model-issued call. Unknown names yield a failed result.
    pub async fn execute(&self, name: &str, args: ToolArguments) -> ToolResult {
        // Clone the Arc out so the lock is not held across the call.
        match self.get(name) {
            Some(tool) => tool.execute(args).await,
            None => ToolResult::failure(format!("Unknown tool: {name}")),
        }
    }
}
