// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ticketwerk-bridge: OS collaborator abstractions.
//
// The agent needs a handful of things from the host it runs on: its local
// address, whether the internet is reachable, and WiFi management for the
// setup tooling. The traits live in `traits`; `shell` implements them with
// the standard Linux network tools.

pub mod command;
pub mod shell;
pub mod traits;

use std::time::Duration;

pub use command::SystemRunner;
pub use shell::ShellNetwork;
pub use traits::{CommandOutput, CommandRunner, NetworkInfo, WifiControl};

/// The host network collaborator for `interface`.
pub fn system_network(interface: &str, use_sudo: bool, timeout: Duration) -> ShellNetwork<SystemRunner> {
    ShellNetwork::new(SystemRunner::new(timeout), interface, use_sudo)
}
