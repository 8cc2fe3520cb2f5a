// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ticketwerk: device-side ticket print agent.
//
// Entry point. Initialises logging, parses the command line and reports
// failures as an operator hint with a non-zero exit code.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ticketwerk_agent::cli::Cli;
use ticketwerk_agent::commands;
use ticketwerk_core::human_errors::humanize_error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    match commands::execute(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, fatal = err.is_fatal(), "ticketwerk stopped");
            eprintln!("{}", humanize_error(&err));
            ExitCode::FAILURE
        }
    }
}
