//! air-agent: MCP tool-provider plumbing for a chat client.
//!
//! Keeps a shared [`ToolRegistry`](tools::ToolRegistry) in step with at most
//! one live MCP server connection, so the conversation engine always sees the
//! built-in tools plus the tools of the currently selected server.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use air_agent::prelude::*;
//!
//! # async fn example() -> air_agent::error::Result<()> {
//! let config = AgentConfig::from_env();
//! let settings: Arc<dyn SettingsStore> = Arc::new(config.settings_store());
//! let registry = Arc::new(ToolRegistry::with_tools(air_agent::tools::builtin::default_tools()));
//!
//! let controller = MCPConnectionController::new(
//!     registry.clone(),
//!     Arc::new(SettingsServerStore::new(settings.clone())),
//!     Arc::new(StreamableHttpConnector::from_config(&config)),
//! );
//! let outcome = controller.restore(settings.as_ref()).ready().await;
//! println!("{outcome:?}: {:?}", registry.names());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod mcp;
pub mod prelude;
pub mod prompt;
pub mod tools;
pub mod util;
pub mod workspace;

#[cfg(feature = "cli")]
pub mod cli;
