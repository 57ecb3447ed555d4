//! # Qualys Connector Provisioner
//!
//! Entry point. See [`qualys_connector_provisioner::cli`] for the subcommands.

use anyhow::{Context, Result};
use clap::Parser;
use qualys_connector_provisioner::cli::{Cli, Commands, ConnectorCommands};
use qualys_connector_provisioner::config::ProvisionerConfig;
use qualys_connector_provisioner::event::AccountCreationEvent;
use qualys_connector_provisioner::qualys::ConnectorService;
use qualys_connector_provisioner::runtime;
use qualys_connector_provisioner::server::{start_server, ServerState};
use std::io::Read;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    runtime::initialize()?;

    let config = ProvisionerConfig::from_env().context("Invalid configuration")?;
    info!(?config, "Configuration loaded");

    match cli.command {
        Commands::Serve { port } => {
            let provisioner = runtime::build_provisioner(&config).await?;
            let state = Arc::new(ServerState::new(provisioner));
            start_server(port.unwrap_or(config.metrics_port), state).await?;
        }
        Commands::Handle { event } => {
            let raw = match event {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read event file {}", path.display()))?,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buffer)
                        .context("Failed to read event from stdin")?;
                    buffer
                }
            };
            let event: AccountCreationEvent =
                serde_json::from_str(&raw).context("Event is not valid JSON")?;

            let provisioner = runtime::build_provisioner(&config).await?;
            let outcome = provisioner.handle_event(&event).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Connectors { command } => {
            let connectors = runtime::connector_service(&config)?;
            match command {
                ConnectorCommands::List => {
                    for connector in connectors.list_connectors().await? {
                        println!("{connector}\n");
                    }
                }
                ConnectorCommands::Show { name } => match connectors.find_by_name(&name).await? {
                    Some(connector) => println!("{connector}"),
                    None => anyhow::bail!("No connector named {name:?}"),
                },
            }
        }
    }

    Ok(())
}
