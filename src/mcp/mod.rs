//! Model Context Protocol (MCP) connection lifecycle and tool bridge.

pub mod bridge;
pub mod client;
pub mod lifecycle;
pub mod schema;
pub mod server;
pub mod settings;
pub mod transport;

pub use bridge::adapt;
pub use client::{MCPClient, StreamableHttpConnector};
pub use lifecycle::{
    ConnectionStage, ConnectionStatus, MCPConnectionController, StatusSnapshot, TransitionHandle,
    TransitionOutcome,
};
pub use schema::{MCPToolCallResult, RemoteToolDescriptor};
pub use server::{
    InMemoryServerStore, NewServer, ServerConfig, ServerConfigStore, ServerUpdate,
    SettingsServerStore,
};
pub use settings::{load_desired_state, save_desired_state, DesiredState};
pub use transport::{MCPConnector, MCPSession};
