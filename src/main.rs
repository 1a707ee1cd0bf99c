//! air-agent CLI binary entry point.

use air_agent::cli::commands;
use air_agent::cli::{Cli, Commands, ServerCommands};
use air_agent::config::AgentConfig;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AgentConfig::from_env();
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let result = match cli.command {
        Commands::Servers(args) => match args.command {
            ServerCommands::List => commands::handle_servers_list(&config),
            ServerCommands::Add(add) => commands::handle_servers_add(
                &config,
                add.name,
                add.url,
                add.description,
                add.api_key,
            ),
            ServerCommands::Remove { id } => commands::handle_servers_remove(&config, &id),
        },
        Commands::Tools(args) => commands::handle_tools(&config, args.server).await,
        Commands::Call(args) => {
            commands::handle_call(&config, args.server, &args.tool, args.arguments.as_deref())
                .await
        }
        Commands::Export { path } => commands::handle_export(&config, path),
        Commands::Import { path } => commands::handle_import(&config, &path),
        Commands::Enable { id } => commands::handle_enable(&config, &id),
        Commands::Disable => commands::handle_disable(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
