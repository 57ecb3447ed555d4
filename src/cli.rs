//! # Command Line
//!
//! ```bash
//! # Serve account creation events over HTTP
//! qualys-connector-provisioner serve --port 8080
//!
//! # Handle one event from a file (or stdin when no file is given)
//! qualys-connector-provisioner handle --event event.json
//!
//! # Inspect connectors
//! qualys-connector-provisioner connectors list
//! qualys-connector-provisioner connectors show "Payments - prd"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Qualys AWS EC2 connector provisioner
#[derive(Debug, Parser)]
#[command(name = "qualys-connector-provisioner", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Accept events on `POST /events` and expose metrics and probes
    Serve {
        /// Listen port (defaults to `METRICS_PORT`)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Provision for a single event and print the outcome as JSON
    Handle {
        /// Event JSON file. Reads stdin when omitted.
        #[arg(short, long)]
        event: Option<PathBuf>,
    },
    /// Query connectors on the Qualys platform
    Connectors {
        #[command(subcommand)]
        command: ConnectorCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConnectorCommands {
    /// List every AWS EC2 connector
    List,
    /// Show the first connector with the given name
    Show {
        /// Connector name
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_handle_with_file() {
        let cli = Cli::try_parse_from(["qcp", "handle", "--event", "event.json"]).unwrap();
        match cli.command {
            Commands::Handle { event } => assert_eq!(event, Some(PathBuf::from("event.json"))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_connectors_show() {
        let cli = Cli::try_parse_from(["qcp", "connectors", "show", "Payments - prd"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Connectors {
                command: ConnectorCommands::Show { ref name }
            } if name == "Payments - prd"
        ));
    }

    #[test]
    fn test_serve_port_is_optional() {
        let cli = Cli::try_parse_from(["qcp", "serve"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { port: None }));
    }
}
