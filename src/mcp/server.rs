//! MCP server configurations and their stores.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SettingsStore;
use crate::error::{AgentError, Result};

/// Settings key holding the JSON array of server configs.
pub const MCP_SERVERS_KEY: &str = "mcp-servers";

/// A configured MCP tool provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServerConfig {
    /// Build a new config with a fresh id and timestamps.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            url: url.into(),
            description: None,
            api_key: None,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Lookup of server configs by id.
pub trait ServerConfigStore: Send + Sync {
    /// `Ok(None)` means the id is unknown.
    fn get_server_config(&self, id: &str) -> Result<Option<ServerConfig>>;
}

/// Server store held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryServerStore {
    servers: RwLock<HashMap<String, ServerConfig>>,
}

impl InMemoryServerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_servers(servers: impl IntoIterator<Item = ServerConfig>) -> Self {
        let store = Self::new();
        for server in servers {
            store.insert(server);
        }
        store
    }

    pub fn insert(&self, server: ServerConfig) {
        self.servers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(server.id.clone(), server);
    }

    pub fn remove(&self, id: &str) -> Option<ServerConfig> {
        self.servers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }
}

impl ServerConfigStore for InMemoryServerStore {
    fn get_server_config(&self, id: &str) -> Result<Option<ServerConfig>> {
        Ok(self
            .servers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned())
    }
}

/// Input for [`SettingsServerStore::add_server`].
#[derive(Debug, Clone, Default)]
pub struct NewServer {
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub api_key: Option<String>,
}

/// Partial update for [`SettingsServerStore::update_server`].
///
/// `None` leaves a field unchanged; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct ServerUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<Option<String>>,
    pub api_key: Option<Option<String>>,
    pub enabled: Option<bool>,
}

/// Server configs persisted as a JSON array in a [`SettingsStore`].
#[derive(Clone)]
pub struct SettingsServerStore {
    settings: Arc<dyn SettingsStore>,
}

impl std::fmt::Debug for SettingsServerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsServerStore").finish_non_exhaustive()
    }
}

impl SettingsServerStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    pub fn list_servers(&self) -> Result<Vec<ServerConfig>> {
        parse_servers(self.settings.get(MCP_SERVERS_KEY)?.as_deref())
    }

    /// Replace the whole server list.
    pub fn save_servers(&self, servers: &[ServerConfig]) -> Result<()> {
        let raw = serde_json::to_string(servers)?;
        self.settings.set(MCP_SERVERS_KEY, &raw)
    }

    pub fn add_server(&self, new: NewServer) -> Result<ServerConfig> {
        validate_name(&new.name)?;
        validate_url(&new.url)?;

        let mut server = ServerConfig::new(new.name.trim(), new.url.trim());
        server.description = new.description.filter(|d| !d.trim().is_empty());
        server.api_key = new.api_key.filter(|k| !k.trim().is_empty());

        let mut servers = self.list_servers()?;
        servers.push(server.clone());
        self.save_servers(&servers)?;
        tracing::info!(server_id = %server.id, name = %server.name, "Added MCP server");
        Ok(server)
    }

    pub fn update_server(&self, id: &str, update: ServerUpdate) -> Result<ServerConfig> {
        let mut servers = self.list_servers()?;
        let server = servers
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AgentError::ServerNotFound(id.to_string()))?;

        if let Some(name) = update.name {
            validate_name(&name)?;
            server.name = name.trim().to_string();
        }
        if let Some(url) = update.url {
            validate_url(&url)?;
            server.url = url.trim().to_string();
        }
        if let Some(description) = update.description {
            server.description = description;
        }
        if let Some(api_key) = update.api_key {
            server.api_key = api_key;
        }
        if let Some(enabled) = update.enabled {
            server.enabled = enabled;
        }
        server.updated_at = Utc::now();

        let updated = server.clone();
        self.save_servers(&servers)?;
        Ok(updated)
    }

    /// Returns `false` when no server had `id`.
    pub fn remove_server(&self, id: &str) -> Result<bool> {
        let mut servers = self.list_servers()?;
        let before = servers.len();
        servers.retain(|s| s.id != id);
        if servers.len() == before {
            return Ok(false);
        }
        self.save_servers(&servers)?;
        Ok(true)
    }
}

impl ServerConfigStore for SettingsServerStore {
    fn get_server_config(&self, id: &str) -> Result<Option<ServerConfig>> {
        Ok(self.list_servers()?.into_iter().find(|s| s.id == id))
    }
}

pub(crate) fn parse_servers(stored: Option<&str>) -> Result<Vec<ServerConfig>> {
    let Some(raw) = stored.filter(|raw| !raw.trim().is_empty()) else {
        return Ok(Vec::new());
    };
    serde_json::from_str(raw)
        .map_err(|_| AgentError::Configuration("Invalid MCP server config format".into()))
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AgentError::InvalidArgument("Server name must not be empty".into()));
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url.trim())
        .map_err(|e| AgentError::InvalidArgument(format!("Invalid server URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AgentError::InvalidArgument(format!(
            "Unsupported server URL scheme: {other}"
        ))),
    }
}
