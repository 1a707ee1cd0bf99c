//! Configuration (layered: code > env > defaults).

pub mod store;

pub use store::{FileSettingsStore, MemorySettingsStore, SettingsStore};

use std::path::PathBuf;
use std::time::Duration;

use bon::Builder;

/// Default TCP connect timeout for MCP HTTP clients.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound for best-effort enrichment lookups (e.g. location).
pub const DEFAULT_ENRICHMENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime configuration for air-agent.
///
/// ```
/// use std::time::Duration;
/// use air_agent::config::AgentConfig;
///
/// let config = AgentConfig::builder()
///     .data_dir("/tmp/air-agent")
///     .enrichment_timeout(Duration::from_millis(500))
///     .build();
/// assert_eq!(config.enrichment_timeout, Duration::from_millis(500));
/// ```
#[derive(Debug, Clone, Builder)]
pub struct AgentConfig {
    /// Directory holding `settings.toml`.
    #[builder(into, default = default_data_dir())]
    pub data_dir: PathBuf,
    #[builder(default = DEFAULT_CONNECT_TIMEOUT)]
    pub connect_timeout: Duration,
    #[builder(default = DEFAULT_ENRICHMENT_TIMEOUT)]
    pub enrichment_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AgentConfig {
    /// Load from environment variables (AIR_AGENT_HOME, AIR_AGENT_*_TIMEOUT_MS).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();

        if let Ok(home) = std::env::var("AIR_AGENT_HOME") {
            if !home.trim().is_empty() {
                config.data_dir = PathBuf::from(home);
            }
        }
        if let Some(timeout) = env_millis("AIR_AGENT_CONNECT_TIMEOUT_MS") {
            config.connect_timeout = timeout;
        }
        if let Some(timeout) = env_millis("AIR_AGENT_ENRICHMENT_TIMEOUT_MS") {
            config.enrichment_timeout = timeout;
        }

        config
    }

    /// File-backed settings store rooted at `data_dir`.
    pub fn settings_store(&self) -> FileSettingsStore {
        FileSettingsStore::new(self.data_dir.clone())
    }
}

fn env_millis(var: &str) -> Option<Duration> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(e) => {
            tracing::warn!(var, value = %raw, error = %e, "Ignoring non-numeric timeout");
            None
        }
    }
}

pub(crate) fn default_data_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".air-agent"))
        .unwrap_or_else(|| PathBuf::from(".air-agent"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = AgentConfig::default();
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.enrichment_timeout, DEFAULT_ENRICHMENT_TIMEOUT);
        assert!(config.data_dir.ends_with(".air-agent"));
    }

    #[test]
    fn builder_overrides_data_dir() {
        let config = AgentConfig::builder().data_dir("/tmp/agent-home").build();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/agent-home"));
    }
}
