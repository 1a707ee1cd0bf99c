use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use air_agent::config::AgentConfig;
use air_agent::mcp::{
    ConnectionStage, ConnectionStatus, DesiredState, InMemoryServerStore, MCPConnectionController,
    MCPConnector, ServerConfig, StreamableHttpConnector, TransitionOutcome,
};
use air_agent::tools::builtin::default_tools;
use air_agent::tools::{ToolArguments, ToolRegistry};
use serde_json::json;
use tokio::time::timeout;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn mcp_tools_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string"
            }
        }
    })
}

fn mock_mcp_http_handler(
    server_name: &'static str,
    tools: &'static [(&'static str, &'static str)],
) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync {
    move |request: &Request| {
        let body: serde_json::Value = request.body_json().unwrap_or_else(|_| json!({}));
        let method = body
            .get("method")
            .and_then(|value| value.as_str())
            .unwrap_or_default();
        let id = body.get("id").cloned().unwrap_or_else(|| json!(1));

        match method {
            "initialize" => ResponseTemplate::new(200)
                .insert_header("mcp-session-id", format!("{server_name}-session"))
                .set_body_json(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {
                        "protocolVersion": "2025-03-26",
                        "capabilities": { "tools": { "listChanged": false } },
                        "serverInfo": {
                            "name": server_name,
                            "version": "0.1.0"
                        }
                    }
                })),
            "tools/list" => {
                let tool_definitions: Vec<_> = tools
                    .iter()
                    .map(|(tool_name, description)| {
                        json!({
                            "name": tool_name,
                            "description": description,
                            "inputSchema": mcp_tools_schema()
                        })
                    })
                    .collect();
                ResponseTemplate::new(200).set_body_json(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {
                        "tools": tool_definitions
                    }
                }))
            }
            "tools/call" => {
                let called_tool = body
                    .get("params")
                    .and_then(|params| params.get("name"))
                    .and_then(|name| name.as_str())
                    .unwrap_or_default();
                let arguments = body
                    .get("params")
                    .and_then(|params| params.get("arguments"))
                    .cloned()
                    .unwrap_or_else(|| json!({}));
                if called_tool == "broken" {
                    return ResponseTemplate::new(200).set_body_json(json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "result": {
                            "content": [{ "type": "text", "text": "index unavailable" }],
                            "isError": true
                        }
                    }));
                }
                ResponseTemplate::new(200).set_body_json(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {
                        "content": [{ "type": "text", "text": format!("{server_name}:{called_tool}") }],
                        "structuredContent": {
                            "server": server_name,
                            "tool": called_tool,
                            "arguments": arguments
                        },
                        "isError": false
                    }
                }))
            }
            "notifications/initialized" => ResponseTemplate::new(202),
            _ => ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {}
            })),
        }
    }
}

async fn mount_mcp_server(
    server_name: &'static str,
    tools: &'static [(&'static str, &'static str)],
) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(mock_mcp_http_handler(server_name, tools))
        .mount(&server)
        .await;
    // No standalone SSE stream.
    Mock::given(method("GET"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

fn request_methods(requests: &[Request]) -> HashSet<String> {
    requests
        .iter()
        .filter_map(|request| {
            request
                .body_json::<serde_json::Value>()
                .ok()
                .and_then(|body| {
                    body.get("method")
                        .and_then(|method| method.as_str())
                        .map(str::to_string)
                })
        })
        .collect()
}

fn post_headers_match(requests: &[Request], header: &str, expected: &str) -> bool {
    requests
        .iter()
        .filter(|request| request.method.as_str() == "POST")
        .all(|request| {
            request
                .headers
                .get(header)
                .and_then(|value| value.to_str().ok())
                == Some(expected)
        })
}

fn connector() -> StreamableHttpConnector {
    StreamableHttpConnector::from_config(
        &AgentConfig::builder()
            .connect_timeout(Duration::from_secs(2))
            .build(),
    )
}

fn controller(servers: Vec<ServerConfig>) -> MCPConnectionController {
    MCPConnectionController::new(
        Arc::new(ToolRegistry::with_tools(default_tools())),
        Arc::new(InMemoryServerStore::with_servers(servers)),
        Arc::new(connector()),
    )
}

#[tokio::test]
async fn streamable_http_session_lists_and_calls_tools() {
    let server = mount_mcp_server("alpha", &[("search", "Alpha search tool")]).await;
    let config = ServerConfig::new("Alpha", format!("{}/mcp", server.uri()))
        .with_id("alpha")
        .with_api_key("secret-token");

    let session = timeout(Duration::from_secs(5), connector().open(&config))
        .await
        .expect("open should complete before timeout")
        .expect("MCP session should initialize");

    let tools = timeout(Duration::from_secs(5), session.list_tools())
        .await
        .expect("tools/list should complete before timeout")
        .expect("MCP session should return tools");
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "search");
    assert_eq!(tools[0].description.as_deref(), Some("Alpha search tool"));
    assert_eq!(tools[0].input_schema, Some(mcp_tools_schema()));

    let result = timeout(
        Duration::from_secs(5),
        session.call_tool("search", json!({"query": "rust"})),
    )
    .await
    .expect("tools/call should complete before timeout")
    .expect("tool call should succeed");
    assert_eq!(
        result.into_value_or_text(),
        json!({"server": "alpha", "tool": "search", "arguments": {"query": "rust"}})
    );

    timeout(Duration::from_secs(5), session.close())
        .await
        .expect("close should complete before timeout")
        .expect("close should succeed");
    session
        .close()
        .await
        .expect("closing twice should be harmless");

    let requests = server
        .received_requests()
        .await
        .expect("server should have captured requests");
    let methods = request_methods(&requests);
    assert!(methods.contains("initialize"));
    assert!(methods.contains("tools/list"));
    assert!(methods.contains("tools/call"));
    assert!(post_headers_match(
        &requests,
        "authorization",
        "Bearer secret-token"
    ));
}

#[tokio::test]
async fn controller_registers_remote_tools_and_maps_errors() {
    let server = mount_mcp_server(
        "alpha",
        &[("search", "Alpha search tool"), ("broken", "Always fails")],
    )
    .await;
    let controller = controller(vec![ServerConfig::new(
        "Alpha",
        format!("{}/mcp", server.uri()),
    )
    .with_id("alpha")]);

    let outcome = timeout(
        Duration::from_secs(5),
        controller
            .set_desired_state(DesiredState::enabled("alpha"))
            .ready(),
    )
    .await
    .expect("transition should settle");
    assert_eq!(outcome, TransitionOutcome::Connected { tool_count: 2 });

    let registry = controller.registry();
    assert!(registry.contains("calculator"));
    let ok = registry
        .execute("search", ToolArguments::new(json!({"query": "mcp"})))
        .await;
    assert!(ok.success);
    assert_eq!(ok.result["server"], json!("alpha"));

    let failed = registry
        .execute("broken", ToolArguments::new(json!({})))
        .await;
    assert!(!failed.success);
    assert_eq!(failed.error.as_deref(), Some("index unavailable"));
    assert_eq!(controller.current_status().status, ConnectionStatus::Connected);

    controller.disconnect().ready().await;
    assert!(!registry.contains("search"));
}

#[tokio::test]
async fn unreachable_server_fails_at_connect_stage() {
    let server = MockServer::start().await;
    let url = format!("{}/mcp", server.uri());
    drop(server);

    let controller = controller(vec![ServerConfig::new("Gone", url).with_id("gone")]);
    let outcome = timeout(
        Duration::from_secs(10),
        controller
            .set_desired_state(DesiredState::enabled("gone"))
            .ready(),
    )
    .await
    .expect("transition should settle");

    assert!(matches!(
        outcome,
        TransitionOutcome::Failed {
            stage: ConnectionStage::Connect,
            ..
        }
    ));
    let status = controller.current_status();
    assert_eq!(status.status, ConnectionStatus::Error);
    assert!(status.error.is_some());
    assert_eq!(controller.registry().len(), 2);
}
