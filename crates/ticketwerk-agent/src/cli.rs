// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Device-side ticket print agent.
#[derive(Debug, Parser)]
#[command(name = "ticketwerk", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding config.json and credentials.json.
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the ticket server and print jobs until interrupted.
    Run,

    /// Register this device and write config.json and credentials.json.
    Setup {
        /// Server base URL, e.g. https://tickets.example.com/api.
        #[arg(long)]
        server: Option<String>,

        /// Device name shown to administrators.
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        company_id: Option<String>,
    },

    /// Show this device's registration and approval status.
    Status,

    /// Print the effective configuration with the API key masked.
    Config,

    /// Encode a ticket id into a QR token.
    Encode {
        /// Ticket `type` field: `checkout` for bundles, anything else for single tickets.
        ticket_type: String,
        identifier: String,
    },

    /// Decode a scanned QR token.
    Decode { token: String },

    /// Print a ticket JSON file through the local strategy chain.
    Print {
        /// A job (`{"id", "ticketData"}`) or bare ticket data.
        file: PathBuf,
    },

    /// Render a ticket JSON file to a receipt PDF without printing.
    Render {
        file: PathBuf,

        #[arg(long, short, value_name = "PDF")]
        out: PathBuf,

        /// Also write the QR code alone as a PNG.
        #[arg(long, value_name = "PNG")]
        qr: Option<PathBuf>,
    },

    /// Network diagnostics and WiFi setup.
    Network {
        #[command(subcommand)]
        action: NetworkCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum NetworkCommand {
    /// Local IPv4 address.
    Ip,
    /// Whether the internet is reachable.
    Check,
    /// Visible WiFi networks.
    WifiList,
    /// SSID of the active WiFi connection.
    WifiCurrent,
    /// Join a WiFi network.
    WifiConnect {
        ssid: String,
        /// Omit for open networks.
        #[arg(default_value = "")]
        password: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_global_flags() {
        let cli = Cli::parse_from(["ticketwerk", "run", "--config-dir", "/etc/ticketwerk", "-v"]);
        assert!(matches!(cli.command, Command::Run));
        assert_eq!(cli.config_dir.as_deref(), Some(std::path::Path::new("/etc/ticketwerk")));
        assert!(cli.verbose);
    }

    #[test]
    fn parses_setup_options() {
        let cli = Cli::parse_from([
            "ticketwerk",
            "setup",
            "--server",
            "https://tickets.example.com/api",
            "--name",
            "box-office",
            "--company-id",
            "c-42",
        ]);
        match cli.command {
            Command::Setup { server, name, company_id } => {
                assert_eq!(server.as_deref(), Some("https://tickets.example.com/api"));
                assert_eq!(name.as_deref(), Some("box-office"));
                assert_eq!(company_id.as_deref(), Some("c-42"));
            }
            other => panic!("expected Setup, got {other:?}"),
        }
    }

    #[test]
    fn parses_encode_arguments_in_order() {
        let cli = Cli::parse_from(["ticketwerk", "encode", "checkout", "bb5f93d3-7489-42fc-a721-be6bdd1780a4"]);
        match cli.command {
            Command::Encode { ticket_type, identifier } => {
                assert_eq!(ticket_type, "checkout");
                assert_eq!(identifier, "bb5f93d3-7489-42fc-a721-be6bdd1780a4");
            }
            other => panic!("expected Encode, got {other:?}"),
        }
    }

    #[test]
    fn network_subcommands_are_kebab_case() {
        let cli = Cli::parse_from(["ticketwerk", "network", "wifi-connect", "Cafe"]);
        match cli.command {
            Command::Network {
                action: NetworkCommand::WifiConnect { ssid, password },
            } => {
                assert_eq!(ssid, "Cafe");
                assert!(password.is_empty());
            }
            other => panic!("expected wifi-connect, got {other:?}"),
        }
        assert!(Cli::try_parse_from(["ticketwerk", "network", "wifi-list"]).is_ok());
    }

    #[test]
    fn render_requires_output_path() {
        assert!(Cli::try_parse_from(["ticketwerk", "render", "ticket.json"]).is_err());
        assert!(Cli::try_parse_from(["ticketwerk", "render", "ticket.json", "-o", "out.pdf"]).is_ok());
        let cli = Cli::parse_from(["ticketwerk", "render", "ticket.json", "-o", "out.pdf", "--qr", "qr.png"]);
        match cli.command {
            Command::Render { qr, .. } => assert_eq!(qr.as_deref(), Some(std::path::Path::new("qr.png"))),
            other => panic!("expected Render, got {other:?}"),
        }
    }
}
