//! Error types for air-agent.

use thiserror::Error;

/// Status message shown when a selected server id has no stored configuration.
pub const SERVER_NOT_FOUND_MESSAGE: &str = "Server configuration not found";

/// Primary error type for all air-agent operations.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{}", SERVER_NOT_FOUND_MESSAGE)]
    ServerNotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Broad error category, used to decide where an error is recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or malformed configuration. Never retried automatically.
    Configuration,
    /// Connect, list or protocol failure. Surfaces as connection status.
    Transport,
    /// A single tool call failed. Surfaces as a failed tool result.
    ToolInvocation,
    /// Local persistence or (de)serialization failure.
    Storage,
    Unknown,
}

impl AgentError {
    /// Create a tool execution error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::ServerNotFound(_) => ErrorCategory::Configuration,
            Self::Transport(_) | Self::Network(_) | Self::Timeout(_) | Self::Provider { .. } => {
                ErrorCategory::Transport
            }
            Self::ToolExecution { .. } | Self::InvalidArgument(_) => ErrorCategory::ToolInvocation,
            Self::Io(_) | Self::Serialization(_) | Self::Storage(_) => ErrorCategory::Storage,
            Self::InvalidState(_) => ErrorCategory::Unknown,
        }
    }

    /// Message suitable for a status line or a failed tool result.
    ///
    /// Tool execution errors carry the remote message without the wrapper text.
    pub fn user_message(&self) -> String {
        match self {
            Self::ToolExecution { message, .. } => message.clone(),
            Self::Transport(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for AgentError {
    fn from(error: toml::de::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<toml::ser::Error> for AgentError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AgentError>;
