//! CLI command handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{AgentConfig, SettingsStore};
use crate::mcp::{
    load_desired_state, save_desired_state, DesiredState, MCPConnectionController, NewServer,
    ServerConfigStore, SettingsServerStore, StreamableHttpConnector, TransitionOutcome,
};
use crate::tools::builtin::default_tools;
use crate::tools::{ToolArguments, ToolRegistry, ToolSource};
use crate::workspace::{export_workspace, import_workspace};

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn settings(config: &AgentConfig) -> Arc<dyn SettingsStore> {
    Arc::new(config.settings_store())
}

fn controller(config: &AgentConfig, settings: Arc<dyn SettingsStore>) -> MCPConnectionController {
    MCPConnectionController::new(
        Arc::new(ToolRegistry::with_tools(default_tools())),
        Arc::new(SettingsServerStore::new(settings)),
        Arc::new(StreamableHttpConnector::from_config(config)),
    )
}

/// Connect to `server`, or to the persisted selection when `None`.
async fn connect(
    config: &AgentConfig,
    server: Option<String>,
) -> Result<MCPConnectionController, Box<dyn std::error::Error>> {
    let settings = settings(config);
    let controller = controller(config, settings.clone());
    let handle = match server {
        Some(id) => controller.set_desired_state(DesiredState::enabled(id)),
        None => controller.restore(settings.as_ref()),
    };

    match handle.ready().await {
        TransitionOutcome::Connected { tool_count } => {
            eprintln!("✅ Connected ({tool_count} MCP tools)");
        }
        TransitionOutcome::Disconnected => eprintln!("MCP is disabled; built-in tools only"),
        TransitionOutcome::Failed { stage, message } => {
            return Err(format!("MCP connection failed during {stage}: {message}").into());
        }
        TransitionOutcome::Superseded => return Err("MCP connection was superseded".into()),
    }
    Ok(controller)
}

pub fn handle_servers_list(config: &AgentConfig) -> CliResult {
    let settings = settings(config);
    let servers = SettingsServerStore::new(settings.clone()).list_servers()?;
    if servers.is_empty() {
        println!("No MCP servers configured");
        return Ok(());
    }

    let desired = load_desired_state(settings.as_ref());
    for server in servers {
        let marker = if desired.target() == Some(server.id.as_str()) {
            "*"
        } else {
            " "
        };
        let state = if server.enabled { "" } else { " (disabled)" };
        println!("{marker} {}  {}  {}{state}", server.id, server.name, server.url);
    }
    Ok(())
}

pub fn handle_servers_add(
    config: &AgentConfig,
    name: String,
    url: String,
    description: Option<String>,
    api_key: Option<String>,
) -> CliResult {
    let store = SettingsServerStore::new(settings(config));
    let server = store.add_server(NewServer {
        name,
        url,
        description,
        api_key,
    })?;
    println!("{}", server.id);
    Ok(())
}

pub fn handle_servers_remove(config: &AgentConfig, id: &str) -> CliResult {
    let settings = settings(config);
    if !SettingsServerStore::new(settings.clone()).remove_server(id)? {
        return Err(format!("No MCP server with id {id}").into());
    }
    if load_desired_state(settings.as_ref()).target() == Some(id) {
        save_desired_state(settings.as_ref(), &DesiredState::disabled())?;
    }
    println!("Removed {id}");
    Ok(())
}

pub async fn handle_tools(config: &AgentConfig, server: Option<String>) -> CliResult {
    let controller = connect(config, server).await?;
    for tool in controller.registry().list_tools() {
        let source = match tool.source() {
            ToolSource::Builtin => "builtin".to_string(),
            ToolSource::Mcp { server_id, .. } => format!("mcp:{server_id}"),
        };
        println!("{:<28} {:<16} {}", tool.name(), source, tool.description());
    }
    controller.disconnect().ready().await;
    Ok(())
}

pub async fn handle_call(
    config: &AgentConfig,
    server: Option<String>,
    tool: &str,
    arguments: Option<&str>,
) -> CliResult {
    let args = ToolArguments::from_json_str(arguments.unwrap_or_default())?;
    let controller = connect(config, server).await?;
    let result = controller.registry().execute(tool, args).await;
    controller.disconnect().ready().await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        std::process::exit(2);
    }
    Ok(())
}

pub fn handle_export(config: &AgentConfig, path: Option<PathBuf>) -> CliResult {
    let json = export_workspace(settings(config).as_ref())?;
    match path {
        Some(path) => {
            std::fs::write(&path, json)?;
            eprintln!("Exported workspace settings to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub fn handle_import(config: &AgentConfig, path: &Path) -> CliResult {
    let json = std::fs::read_to_string(path)?;
    let count = import_workspace(settings(config).as_ref(), &json)?;
    println!("Imported {count} settings section(s)");
    Ok(())
}

pub fn handle_enable(config: &AgentConfig, id: &str) -> CliResult {
    let settings = settings(config);
    let servers = SettingsServerStore::new(settings.clone());
    if servers.get_server_config(id)?.is_none() {
        return Err(format!("No MCP server with id {id}").into());
    }
    save_desired_state(settings.as_ref(), &DesiredState::enabled(id))?;
    println!("MCP enabled with server {id}");
    Ok(())
}

pub fn handle_disable(config: &AgentConfig) -> CliResult {
    save_desired_state(settings(config).as_ref(), &DesiredState::disabled())?;
    println!("MCP disabled");
    Ok(())
}
