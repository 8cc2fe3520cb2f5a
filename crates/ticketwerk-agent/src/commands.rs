// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand handlers. Each returns the process exit code; errors bubble up
// to `main`, which turns them into an operator hint.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{info, warn};

use ticketwerk_bridge::{NetworkInfo, WifiControl};
use ticketwerk_core::codec::{detag_and_decode, tag_and_encode};
use ticketwerk_core::config::{
    ApiConfig, Credentials, FileConfig, PrinterSettings, mask_secret, resolve_config_dir,
};
use ticketwerk_core::error::{Result, TicketwerkError};
use ticketwerk_core::{AgentConfig, DeviceStatus, EncodedToken, Job, TicketData, TicketKind};
use ticketwerk_document::{ReceiptLayout, TicketPdfWriter, render_qr, render_qr_png};
use ticketwerk_print::PrintableTicket;

use crate::cli::{Cli, Command, NetworkCommand};
use crate::remote::{HttpJobSource, RegisterRequest, Registration, register_device};
use crate::services::{AgentServices, build_chain, network_for};

pub async fn execute(cli: Cli) -> Result<ExitCode> {
    let dir = resolve_config_dir(cli.config_dir.as_deref());

    match cli.command {
        Command::Run => run(&dir).await,
        Command::Setup {
            server,
            name,
            company_id,
        } => {
            let options = SetupOptions {
                server,
                name,
                company_id,
            };
            let settings = printer_settings(&dir)?;
            let registration = setup_device(&dir, options, &network_for(&settings)).await?;
            print_registration(&dir, &registration);
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => status(&dir).await,
        Command::Config => {
            let config = AgentConfig::load(&dir)?;
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Encode {
            ticket_type,
            identifier,
        } => {
            println!("{}", encode_token(&ticket_type, &identifier));
            Ok(ExitCode::SUCCESS)
        }
        Command::Decode { token } => match describe_token(&token) {
            Ok(line) => {
                println!("{line}");
                Ok(ExitCode::SUCCESS)
            }
            Err(reason) => {
                eprintln!("invalid token: {reason}");
                Ok(ExitCode::FAILURE)
            }
        },
        Command::Print { file } => print_file(&dir, &file).await,
        Command::Render { file, out, qr } => {
            render_file(&file, &out, qr.as_deref())?;
            println!("{}", out.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Network { action } => network(&dir, action).await,
    }
}

async fn run(dir: &Path) -> Result<ExitCode> {
    let config = Arc::new(AgentConfig::load(dir)?);
    let services = AgentServices::init(config)?;
    let scheduler = services.scheduler().await;

    let handle = scheduler.handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        handle.stop();
    });

    scheduler.run().await;
    Ok(ExitCode::SUCCESS)
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown requested, finishing current job");
}

/// Overrides for `ticketwerk setup`.
#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    pub server: Option<String>,
    pub name: Option<String>,
    pub company_id: Option<String>,
}

/// Register with the server and persist `config.json` and `credentials.json`.
///
/// An existing `config.json` is reused with the options applied on top;
/// without one, `server` is required.
pub async fn setup_device(dir: &Path, options: SetupOptions, network: &dyn NetworkInfo) -> Result<Registration> {
    let mut file = match FileConfig::load(dir) {
        Ok(file) => file,
        Err(TicketwerkError::ConfigurationMissing(path)) => {
            let Some(base_url) = options.server.clone() else {
                return Err(TicketwerkError::ConfigurationMissing(path));
            };
            FileConfig {
                api: ApiConfig {
                    base_url,
                    endpoints: Default::default(),
                },
                printer: PrinterSettings::default(),
            }
        }
        Err(err) => return Err(err),
    };
    if let Some(server) = options.server {
        file.api.base_url = server;
    }
    if let Some(name) = options.name {
        file.printer.name = name;
    }
    if options.company_id.is_some() {
        file.printer.company_id = options.company_id;
    }
    file.validate()?;

    let ip = network.local_ip().await?;
    info!(%ip, name = %file.printer.name, "registering device");

    let request = RegisterRequest {
        name: file.printer.name.clone(),
        ip_address: ip.to_string(),
        company_id: file.printer.company_id.clone(),
    };
    let registration = register_device(&file.api, file.printer.request_timeout(), &request).await?;

    file.save(dir)?;
    Credentials {
        device_id: registration.id.clone(),
        api_key: registration.api_key.clone(),
        name: Some(registration.name.clone()),
    }
    .save(dir)?;
    Ok(registration)
}

fn print_registration(dir: &Path, registration: &Registration) {
    println!("Device:   {} ({})", registration.name, registration.id);
    println!("Status:   {}", registration.status);
    println!("API key:  {}", mask_secret(&registration.api_key));
    println!("Saved to: {}", dir.display());
    if registration.status == DeviceStatus::Pending {
        println!();
        println!("This device is waiting for approval by an administrator.");
        println!("Check progress with `ticketwerk status`.");
    }
}

async fn status(dir: &Path) -> Result<ExitCode> {
    let config = AgentConfig::load(dir)?;
    let source = HttpJobSource::new(
        config.api.clone(),
        config.credentials.api_key.clone(),
        config.printer.request_timeout(),
    )?;
    let device = source.device_status().await?;

    println!("Name:       {}", device.name);
    println!("ID:         {}", device.id);
    println!("IP:         {}", device.ip_address.as_deref().unwrap_or("not detected"));
    println!("Status:     {}", device.status);
    println!("Last seen:  {}", device.last_seen.as_deref().unwrap_or("never"));
    println!("Registered: {}", device.created_at.as_deref().unwrap_or("unknown"));
    Ok(ExitCode::SUCCESS)
}

pub fn encode_token(ticket_type: &str, identifier: &str) -> EncodedToken {
    tag_and_encode(TicketKind::from_type_field(Some(ticket_type)), identifier)
}

/// `"<kind> <identifier>"` for a valid token, or why it is not one.
pub fn describe_token(token: &str) -> std::result::Result<String, String> {
    detag_and_decode(token.trim())
        .map(|decoded| format!("{} {}", decoded.kind, decoded.identifier))
        .map_err(|e| e.to_string())
}

/// Read a job or bare ticket data from a JSON file.
pub fn load_ticket(path: &Path) -> Result<(String, TicketData)> {
    let raw = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    if value.get("ticketData").is_some() {
        let job: Job = serde_json::from_value(value)?;
        Ok((job.id, job.ticket_data))
    } else {
        let ticket: TicketData = serde_json::from_value(value)?;
        Ok((format!("local-{}", ticket.id()), ticket))
    }
}

async fn print_file(dir: &Path, file: &Path) -> Result<ExitCode> {
    let (job_id, ticket) = load_ticket(file)?;
    let settings = printer_settings(dir)?;
    let chain = build_chain(&settings).await;

    let ticket = PrintableTicket::from_ticket(job_id, ticket);
    let outcome = chain.print(&ticket).await;
    if outcome.success {
        println!(
            "printed {} via {}",
            ticket.token,
            outcome.strategy.as_deref().unwrap_or("?")
        );
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("print failed: {}", outcome.error.as_deref().unwrap_or("unknown error"));
        Ok(ExitCode::FAILURE)
    }
}

/// Receipt PDF for a ticket file, plus the bare QR code as PNG when asked.
pub fn render_file(file: &Path, out: &Path, qr_out: Option<&Path>) -> Result<()> {
    let (job_id, ticket) = load_ticket(file)?;
    let printable = PrintableTicket::from_ticket(job_id, ticket);
    let layout = ReceiptLayout::build(&printable.ticket, &printable.token, printable.printed_at);
    let qr = render_qr(printable.token.as_str())?;
    TicketPdfWriter::new().write_to_file(&layout, &qr, out)?;

    if let Some(path) = qr_out {
        std::fs::write(path, render_qr_png(printable.token.as_str())?)?;
        info!(path = %path.display(), token = %printable.token, "QR code written");
    }
    Ok(())
}

/// Printer settings from `config.json`, or defaults before setup has run.
fn printer_settings(dir: &Path) -> Result<PrinterSettings> {
    match FileConfig::load(dir) {
        Ok(file) => Ok(file.printer),
        Err(TicketwerkError::ConfigurationMissing(_)) => Ok(PrinterSettings::default()),
        Err(err) => Err(err),
    }
}

async fn network(dir: &Path, action: NetworkCommand) -> Result<ExitCode> {
    let settings = printer_settings(dir)?;
    let net = network_for(&settings);

    match action {
        NetworkCommand::Ip => println!("{}", net.local_ip().await?),
        NetworkCommand::Check => {
            if net.internet_reachable().await {
                println!("online");
            } else {
                println!("offline");
                return Ok(ExitCode::FAILURE);
            }
        }
        NetworkCommand::WifiList => {
            for ssid in net.list_networks().await? {
                println!("{ssid}");
            }
        }
        NetworkCommand::WifiCurrent => match net.current_network().await? {
            Some(ssid) => println!("{ssid}"),
            None => {
                println!("not connected");
                return Ok(ExitCode::FAILURE);
            }
        },
        NetworkCommand::WifiConnect { ssid, password } => {
            net.connect(&ssid, &password).await?;
            println!("connected to {ssid}");
        }
    }
    Ok(ExitCode::SUCCESS)
}
