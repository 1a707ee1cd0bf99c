//! rmcp-backed MCP sessions over streamable HTTP.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rmcp::{
    model::{
        CallToolRequestParams, CallToolResult, ClientInfo, Content, JsonObject, ProtocolVersion,
        ResourceContents,
    },
    service::{
        ClientInitializeError, DynService, Peer, RoleClient, RunningService, ServiceError,
        ServiceExt,
    },
    transport::{
        streamable_http_client::StreamableHttpClientTransportConfig,
        StreamableHttpClientTransport,
    },
};
use tokio::sync::Mutex;

use super::schema::{MCPToolCallResult, RemoteToolDescriptor};
use super::server::ServerConfig;
use super::transport::{MCPConnector, MCPSession};
use crate::config::AgentConfig;
use crate::error::AgentError;

pub type DynClientService = Box<dyn DynService<RoleClient>>;
pub type MCPRunningService = RunningService<RoleClient, DynClientService>;

/// Live session with one MCP server.
///
/// Tool calls go through a cloned [`Peer`], so they never wait on the
/// service handle that `close` takes.
pub struct MCPClient {
    server_id: String,
    peer: Peer<RoleClient>,
    service: Mutex<Option<MCPRunningService>>,
    closed: AtomicBool,
}

impl MCPClient {
    /// Wrap an already-initialized rmcp service.
    pub fn from_running_service(server_id: impl Into<String>, service: MCPRunningService) -> Self {
        Self {
            server_id: server_id.into(),
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
            closed: AtomicBool::new(false),
        }
    }

    /// Convert an rmcp initialization result into a client.
    pub fn from_running_service_result(
        server_id: impl Into<String>,
        result: Result<MCPRunningService, ClientInitializeError>,
    ) -> Result<Self, AgentError> {
        let server_id = server_id.into();
        result
            .map(|service| Self::from_running_service(server_id, service))
            .map_err(map_client_initialize_error)
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), AgentError> {
        if self.is_closed() {
            return Err(AgentError::Transport("MCP session is closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MCPSession for MCPClient {
    async fn list_tools(&self) -> Result<Vec<RemoteToolDescriptor>, AgentError> {
        self.ensure_open()?;

        let tools = match self.peer.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => {
                let page = self
                    .peer
                    .list_tools(None)
                    .await
                    .map_err(|e| map_service_error("list_tools", e))?;
                page.tools
            }
            Err(e) => return Err(map_service_error("list_tools", e)),
        };

        Ok(tools.into_iter().map(map_mcp_tool).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<MCPToolCallResult, AgentError> {
        self.ensure_open()?;
        let arguments = coerce_tool_arguments(arguments)?;

        let result = self
            .peer
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments,
                task: None,
            })
            .await
            .map_err(|e| map_service_error("call_tool", e))?;

        map_call_result(name, result)
    }

    async fn close(&self) -> Result<(), AgentError> {
        self.closed.store(true, Ordering::SeqCst);
        let Some(service) = self.service.lock().await.take() else {
            return Ok(());
        };

        let reason = service
            .cancel()
            .await
            .map_err(|e| AgentError::Transport(format!("MCP session shutdown failed: {e}")))?;
        tracing::debug!(server_id = %self.server_id, ?reason, "MCP session closed");
        Ok(())
    }
}

/// Opens [`MCPClient`] sessions over rmcp's streamable-HTTP client.
///
/// A server `api_key` is sent as a bearer token.
#[derive(Debug, Clone)]
pub struct StreamableHttpConnector {
    connect_timeout: Duration,
}

impl StreamableHttpConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.connect_timeout)
    }

    fn transport(
        http: &reqwest::Client,
        config: &ServerConfig,
    ) -> StreamableHttpClientTransport<reqwest::Client> {
        let mut transport_config = StreamableHttpClientTransportConfig::with_uri(config.url.as_str());
        if let Some(api_key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            transport_config.auth_header = Some(api_key.to_string());
        }
        StreamableHttpClientTransport::with_client(http.clone(), transport_config)
    }

    async fn connect_with_protocol_fallback(
        &self,
        config: &ServerConfig,
    ) -> Result<MCPRunningService, AgentError> {
        let http = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .build()?;

        let latest_client_info = ClientInfo {
            protocol_version: ProtocolVersion::LATEST,
            ..Default::default()
        };

        match latest_client_info
            .into_dyn()
            .serve(Self::transport(&http, config))
            .await
        {
            Ok(service) => return Ok(service),
            Err(error) if should_retry_protocol_fallback(&error) => {
                tracing::debug!(server_id = %config.id, "Retrying MCP initialize with 2024-11-05 protocol");
            }
            Err(error) => return Err(map_client_initialize_error(error)),
        }

        let fallback_client_info = ClientInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            ..Default::default()
        };
        fallback_client_info
            .into_dyn()
            .serve(Self::transport(&http, config))
            .await
            .map_err(map_client_initialize_error)
    }
}

impl Default for StreamableHttpConnector {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl MCPConnector for StreamableHttpConnector {
    async fn open(&self, config: &ServerConfig) -> Result<Arc<dyn MCPSession>, AgentError> {
        let service = self.connect_with_protocol_fallback(config).await?;
        Ok(Arc::new(MCPClient::from_running_service(
            config.id.clone(),
            service,
        )))
    }
}

fn should_retry_protocol_fallback(error: &ClientInitializeError) -> bool {
    match error {
        ClientInitializeError::JsonRpcError(error) => {
            let message = error.message.to_ascii_lowercase();
            message.contains("protocol") && message.contains("version")
        }
        _ => false,
    }
}

fn map_mcp_tool(tool: rmcp::model::Tool) -> RemoteToolDescriptor {
    RemoteToolDescriptor {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()),
        input_schema: Some(serde_json::Value::Object((*tool.input_schema).clone())),
    }
}

fn coerce_tool_arguments(value: serde_json::Value) -> Result<Option<JsonObject>, AgentError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) => Ok(Some(map)),
        serde_json::Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let parsed: serde_json::Value = serde_json::from_str(trimmed).map_err(|e| {
                AgentError::InvalidArgument(format!("MCP tool arguments must be valid JSON: {e}"))
            })?;
            coerce_tool_arguments(parsed)
        }
        other => Err(AgentError::InvalidArgument(format!(
            "MCP tool arguments must be a JSON object; got {other}"
        ))),
    }
}

fn extract_text_content(content: &[Content]) -> Option<String> {
    let mut lines = Vec::new();
    for item in content {
        if let Some(text) = item.as_text() {
            lines.push(text.text.clone());
            continue;
        }
        if let Some(resource) = item.as_resource() {
            if let ResourceContents::TextResourceContents { text, .. } = &resource.resource {
                lines.push(text.clone());
            }
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn map_call_result(name: &str, result: CallToolResult) -> Result<MCPToolCallResult, AgentError> {
    let text_content = extract_text_content(&result.content);
    let content = result
        .content
        .iter()
        .filter_map(|item| serde_json::to_value(item).ok())
        .collect::<Vec<_>>();

    if result.is_error.unwrap_or(false) {
        let message = text_content
            .clone()
            .or_else(|| result.structured_content.as_ref().map(|v| v.to_string()))
            .unwrap_or_else(|| "MCP tool returned an error result".into());

        return Err(AgentError::tool(name, message));
    }

    Ok(MCPToolCallResult {
        structured_content: result.structured_content,
        text_content,
        content,
    })
}

fn map_client_initialize_error(error: ClientInitializeError) -> AgentError {
    match error {
        ClientInitializeError::ConnectionClosed(context) => {
            AgentError::Transport(format!("MCP initialize connection closed: {context}"))
        }
        ClientInitializeError::TransportError { error, context } => AgentError::Transport(
            format!("MCP initialize transport error ({context}): {error}"),
        ),
        ClientInitializeError::JsonRpcError(error) => AgentError::Provider {
            provider: "mcp".into(),
            message: format!(
                "MCP initialize JSON-RPC error {}: {}",
                error.code.0, error.message
            ),
        },
        ClientInitializeError::Cancelled => {
            AgentError::Transport("MCP initialize cancelled".into())
        }
        other => AgentError::Provider {
            provider: "mcp".into(),
            message: format!("MCP initialize error: {other}"),
        },
    }
}

fn map_service_error(context: &str, error: ServiceError) -> AgentError {
    match error {
        ServiceError::McpError(error) => AgentError::Provider {
            provider: "mcp".into(),
            message: format!("{context}: MCP error {}: {}", error.code.0, error.message),
        },
        ServiceError::TransportSend(error) => {
            AgentError::Transport(format!("{context}: MCP transport send failed: {error}"))
        }
        ServiceError::TransportClosed => {
            AgentError::Transport(format!("{context}: MCP transport closed"))
        }
        ServiceError::UnexpectedResponse => AgentError::Provider {
            provider: "mcp".into(),
            message: format!("{context}: unexpected MCP response"),
        },
        ServiceError::Cancelled { reason } => {
            let suffix = reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            AgentError::Transport(format!("{context}: MCP request cancelled{suffix}"))
        }
        ServiceError::Timeout { timeout } => AgentError::Timeout(timeout.as_millis() as u64),
        other => AgentError::Provider {
            provider: "mcp".into(),
            message: format!("{context}: MCP service error: {other}"),
        },
    }
}
