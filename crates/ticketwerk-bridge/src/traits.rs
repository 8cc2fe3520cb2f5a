// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the OS capabilities the agent needs.
//
// Each trait method is one logical operation. Implementations are free to try
// several tools in turn; callers only see the first usable answer.

use std::net::IpAddr;

use async_trait::async_trait;

use ticketwerk_core::error::Result;

/// Read-only view of the device's network state.
#[async_trait]
pub trait NetworkInfo: Send + Sync {
    /// The address the remote service should reach this device on.
    /// Fails with `NetworkInfoUnavailable` when no usable address is found.
    async fn local_ip(&self) -> Result<IpAddr>;

    /// Whether a well-known public host answers.
    async fn internet_reachable(&self) -> bool;
}

/// Wireless network management.
#[async_trait]
pub trait WifiControl: Send + Sync {
    /// Visible SSIDs, deduplicated and sorted.
    async fn list_networks(&self) -> Result<Vec<String>>;

    /// SSID of the active wireless connection, if any.
    async fn current_network(&self) -> Result<Option<String>>;

    /// Join `ssid`. An empty password joins an open network.
    async fn connect(&self, ssid: &str, password: &str) -> Result<()>;
}

/// Captured result of an external command that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Trimmed stdout when the command exited zero and printed something.
    pub fn text(&self) -> Option<&str> {
        let out = self.stdout.trim();
        (self.success && !out.is_empty()).then_some(out)
    }
}

/// Runs external programs. `Err` means the program could not be run at all
/// (missing binary, timeout); a non-zero exit is a normal `CommandOutput`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}
