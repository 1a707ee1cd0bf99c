//! CLI entry point for air-agent.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// air-agent MCP CLI
#[derive(Parser, Debug)]
#[command(name = "air-agent", version, about = "Manage MCP servers and call their tools")]
pub struct Cli {
    /// Data directory (defaults to AIR_AGENT_HOME or ~/.air-agent)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configured MCP servers
    Servers(ServersArgs),
    /// Connect and list the available tools
    Tools(ToolsArgs),
    /// Call a tool
    Call(CallArgs),
    /// Export workspace settings as JSON
    Export {
        /// Output file (stdout when omitted)
        path: Option<PathBuf>,
    },
    /// Import workspace settings from an exported JSON file
    Import { path: PathBuf },
    /// Enable MCP with the given server
    Enable { id: String },
    /// Disable MCP
    Disable,
}

#[derive(Parser, Debug)]
pub struct ServersArgs {
    #[command(subcommand)]
    pub command: ServerCommands,
}

#[derive(Subcommand, Debug)]
pub enum ServerCommands {
    /// List configured servers
    List,
    /// Add a server
    Add(AddServerArgs),
    /// Remove a server by id
    Remove { id: String },
}

/// Arguments for `air-agent servers add`.
#[derive(Parser, Debug)]
pub struct AddServerArgs {
    pub name: String,
    /// Streamable-HTTP endpoint, e.g. https://example.com/mcp
    pub url: String,
    #[arg(long)]
    pub description: Option<String>,
    /// Sent as a bearer token
    #[arg(long)]
    pub api_key: Option<String>,
}

/// Arguments for `air-agent tools`.
#[derive(Parser, Debug)]
pub struct ToolsArgs {
    /// Server to connect to (defaults to the enabled server)
    #[arg(long)]
    pub server: Option<String>,
}

/// Arguments for `air-agent call`.
#[derive(Parser, Debug)]
pub struct CallArgs {
    /// Server to connect to (defaults to the enabled server)
    #[arg(long)]
    pub server: Option<String>,
    pub tool: String,
    /// Arguments as a JSON object
    pub arguments: Option<String>,
}
