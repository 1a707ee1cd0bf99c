//! Workspace settings export and import.
//!
//! The export file bundles chat settings, MCP server configs and the MCP
//! desired state into one JSON document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SettingsStore;
use crate::error::{AgentError, Result};
use crate::mcp::server::{parse_servers, ServerConfig, MCP_SERVERS_KEY};
use crate::mcp::settings::{DesiredState, MCP_SETTINGS_KEY};

/// Settings key holding [`ChatSettings`].
pub const CHAT_SETTINGS_KEY: &str = "chat-settings";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const EXPORT_VERSION: u32 = 1;

/// Model endpoint settings for the chat client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSettings {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: String::new(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Read chat settings, falling back to defaults when missing or unreadable.
pub fn load_chat_settings(store: &dyn SettingsStore) -> ChatSettings {
    match store.get(CHAT_SETTINGS_KEY) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to load settings");
            ChatSettings::default()
        }),
        Ok(None) => ChatSettings::default(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load settings");
            ChatSettings::default()
        }
    }
}

pub fn save_chat_settings(store: &dyn SettingsStore, settings: &ChatSettings) -> Result<()> {
    store.set(CHAT_SETTINGS_KEY, &serde_json::to_string(settings)?)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceExport {
    version: u32,
    exported_at: DateTime<Utc>,
    settings: ChatSettings,
    mcp_servers: Vec<ServerConfig>,
    mcp_chat_settings: DesiredState,
}

/// Serialize the workspace to pretty JSON.
///
/// Fails if the stored server list or MCP settings are corrupt.
pub fn export_workspace(store: &dyn SettingsStore) -> Result<String> {
    let mcp_chat_settings = match store.get(MCP_SETTINGS_KEY)? {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|_| AgentError::Configuration("Invalid MCP chat settings format".into()))?,
        None => DesiredState::default(),
    };

    let export = WorkspaceExport {
        version: EXPORT_VERSION,
        exported_at: Utc::now(),
        settings: load_chat_settings(store),
        mcp_servers: parse_servers(store.get(MCP_SERVERS_KEY)?.as_deref())?,
        mcp_chat_settings,
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

/// Import a previously exported workspace; returns how many sections were
/// written.
///
/// Every present section is validated before anything is written. The chat
/// settings may sit under `settings` or be the top-level object itself.
pub fn import_workspace(store: &dyn SettingsStore, json: &str) -> Result<usize> {
    let parsed: serde_json::Value = serde_json::from_str(json)
        .map_err(|_| AgentError::Configuration("Invalid import file".into()))?;
    let Some(object) = parsed.as_object() else {
        return Err(AgentError::Configuration("Invalid import file".into()));
    };

    let settings_value = object.get("settings").unwrap_or(&parsed);
    let settings = serde_json::from_value::<ChatSettings>(settings_value.clone()).ok();

    let servers = object
        .get("mcpServers")
        .map(|value| {
            serde_json::from_value::<Vec<ServerConfig>>(value.clone())
                .map_err(|_| AgentError::Configuration("Invalid MCP servers format".into()))
        })
        .transpose()?;

    let desired = object
        .get("mcpChatSettings")
        .map(|value| {
            serde_json::from_value::<DesiredState>(value.clone())
                .map_err(|_| AgentError::Configuration("Invalid MCP chat settings format".into()))
        })
        .transpose()?;

    let mut imported = 0;
    if let Some(settings) = settings {
        save_chat_settings(store, &settings)?;
        imported += 1;
    }
    if let Some(servers) = servers {
        store.set(MCP_SERVERS_KEY, &serde_json::to_string(&servers)?)?;
        imported += 1;
    }
    if let Some(desired) = desired {
        store.set(MCP_SETTINGS_KEY, &serde_json::to_string(&desired)?)?;
        imported += 1;
    }

    if imported == 0 {
        return Err(AgentError::Configuration(
            "No valid settings found in import file".into(),
        ));
    }
    tracing::info!(sections = imported, "Imported workspace settings");
    Ok(imported)
}
