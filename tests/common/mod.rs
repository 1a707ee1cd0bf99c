//! Shared test helpers: a scriptable MCP connector and session.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use air_agent::error::AgentError;
use air_agent::mcp::{
    InMemoryServerStore, MCPConnectionController, MCPConnector, MCPSession, MCPToolCallResult,
    RemoteToolDescriptor, ServerConfig,
};
use air_agent::tools::builtin::default_tools;
use air_agent::tools::ToolRegistry;

/// How a mock server behaves once connected.
#[derive(Clone, Default)]
pub struct MockBehavior {
    pub tools: Vec<RemoteToolDescriptor>,
    pub open_error: Option<String>,
    pub list_error: Option<String>,
    pub call_error: Option<String>,
    pub close_error: Option<String>,
    /// When set, `list_tools` waits for a permit before returning.
    pub list_gate: Option<Arc<Notify>>,
    /// Signalled when `list_tools` is entered.
    pub list_started: Arc<Notify>,
}

impl MockBehavior {
    pub fn with_tools(names: &[&str]) -> Self {
        Self {
            tools: names.iter().map(|name| tool(name)).collect(),
            ..Default::default()
        }
    }

    /// Hold `list_tools` until the returned gate is notified.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.list_gate = Some(gate.clone());
        (self, gate)
    }
}

pub fn tool(name: &str) -> RemoteToolDescriptor {
    RemoteToolDescriptor::new(name)
        .with_description(format!("{name} tool"))
        .with_input_schema(json!({
            "type": "object",
            "properties": {"query": {"type": "string"}}
        }))
}

pub struct MockSession {
    pub server_id: String,
    behavior: MockBehavior,
    pub closes: AtomicUsize,
    pub calls: Mutex<Vec<(String, serde_json::Value)>>,
}

#[async_trait]
impl MCPSession for MockSession {
    async fn list_tools(&self) -> Result<Vec<RemoteToolDescriptor>, AgentError> {
        self.behavior.list_started.notify_one();
        if let Some(gate) = &self.behavior.list_gate {
            gate.notified().await;
        }
        match &self.behavior.list_error {
            Some(message) => Err(AgentError::Transport(message.clone())),
            None => Ok(self.behavior.tools.clone()),
        }
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<MCPToolCallResult, AgentError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        if let Some(message) = &self.behavior.call_error {
            return Err(AgentError::tool(name, message.clone()));
        }
        Ok(MCPToolCallResult {
            structured_content: Some(json!({
                "server": self.server_id,
                "tool": name,
                "arguments": arguments,
            })),
            ..Default::default()
        })
    }

    async fn close(&self) -> Result<(), AgentError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        match &self.behavior.close_error {
            Some(message) => Err(AgentError::Transport(message.clone())),
            None => Ok(()),
        }
    }
}

/// Connector whose servers are scripted per id.
#[derive(Default)]
pub struct MockConnector {
    behaviors: Mutex<HashMap<String, MockBehavior>>,
    sessions: Mutex<Vec<Arc<MockSession>>>,
    pub opens: AtomicUsize,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, server_id: &str, behavior: MockBehavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(server_id.to_string(), behavior);
    }

    /// Resolves once `list_tools` has been entered on `server_id`.
    pub async fn wait_list_started(&self, server_id: &str) {
        let started = self
            .behaviors
            .lock()
            .unwrap()
            .get(server_id)
            .map(|behavior| behavior.list_started.clone())
            .expect("server must be scripted");
        tokio::time::timeout(Duration::from_secs(2), started.notified())
            .await
            .expect("list_tools should start");
    }

    pub fn sessions(&self, server_id: &str) -> Vec<Arc<MockSession>> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|session| session.server_id == server_id)
            .cloned()
            .collect()
    }

    pub fn closes(&self, server_id: &str) -> usize {
        self.sessions(server_id)
            .iter()
            .map(|session| session.closes.load(Ordering::SeqCst))
            .sum()
    }

    /// Every session opened for `server_id` has been closed at least once.
    pub fn all_closed(&self, server_id: &str) -> bool {
        let sessions = self.sessions(server_id);
        !sessions.is_empty()
            && sessions
                .iter()
                .all(|session| session.closes.load(Ordering::SeqCst) > 0)
    }
}

#[async_trait]
impl MCPConnector for MockConnector {
    async fn open(&self, config: &ServerConfig) -> Result<Arc<dyn MCPSession>, AgentError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&config.id)
            .cloned()
            .unwrap_or_default();
        if let Some(message) = &behavior.open_error {
            return Err(AgentError::Transport(message.clone()));
        }

        let session = Arc::new(MockSession {
            server_id: config.id.clone(),
            behavior,
            closes: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        });
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }
}

pub struct Harness {
    pub controller: MCPConnectionController,
    pub connector: Arc<MockConnector>,
    pub servers: Arc<InMemoryServerStore>,
    pub registry: Arc<ToolRegistry>,
}

/// Controller over a registry holding the built-in tools and servers `ids`.
pub fn harness(ids: &[&str]) -> Harness {
    let servers = Arc::new(InMemoryServerStore::with_servers(ids.iter().map(|id| {
        ServerConfig::new(id.to_uppercase(), format!("http://{id}.test/mcp")).with_id(*id)
    })));
    let connector = Arc::new(MockConnector::new());
    let registry = Arc::new(ToolRegistry::with_tools(default_tools()));
    let controller =
        MCPConnectionController::new(registry.clone(), servers.clone(), connector.clone());
    Harness {
        controller,
        connector,
        servers,
        registry,
    }
}

impl Harness {
    /// Names of registered MCP tools, sorted.
    pub fn mcp_tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .registry
            .list_tools()
            .iter()
            .filter(|tool| tool.source().is_mcp())
            .map(|tool| tool.name().to_string())
            .collect();
        names.sort();
        names
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
