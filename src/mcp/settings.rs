//! Persisted MCP desired state (`{mcpEnabled, mcpServerId}`).

use serde::{Deserialize, Serialize};

use crate::config::SettingsStore;
use crate::error::Result;

/// Settings key holding the desired MCP state.
pub const MCP_SETTINGS_KEY: &str = "mcp-settings";

/// What the user asked for: whether MCP is on, and which server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    #[serde(rename = "mcpEnabled")]
    pub enabled: bool,
    #[serde(
        rename = "mcpServerId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub server_id: Option<String>,
}

impl DesiredState {
    pub fn enabled(server_id: impl Into<String>) -> Self {
        Self {
            enabled: true,
            server_id: Some(server_id.into()),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Server to connect to, if this state asks for a connection at all.
    pub fn target(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.server_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Read the persisted desired state.
///
/// Missing or unreadable data yields the default (disabled) state.
pub fn load_desired_state(store: &dyn SettingsStore) -> DesiredState {
    let raw = match store.get(MCP_SETTINGS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return DesiredState::default(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load MCP settings");
            return DesiredState::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load MCP settings");
            DesiredState::default()
        }
    }
}

pub fn save_desired_state(store: &dyn SettingsStore, state: &DesiredState) -> Result<()> {
    let raw = serde_json::to_string(state)?;
    store.set(MCP_SETTINGS_KEY, &raw)
}
