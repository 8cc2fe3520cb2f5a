// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Process-backed `CommandRunner`.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use ticketwerk_core::error::{Result, TicketwerkError};

use crate::traits::{CommandOutput, CommandRunner};

/// Default limit for a single network command. `nmcli device wifi connect`
/// can take several seconds while associating.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs commands directly with `tokio::process`, never through a shell.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    #[instrument(skip(self, args), fields(program = %program))]
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| TicketwerkError::CommandFailed {
                command: program.to_string(),
                detail: format!("timed out after {}ms", self.timeout.as_millis()),
            })?
            .map_err(|e| TicketwerkError::CommandFailed {
                command: program.to_string(),
                detail: e.to_string(),
            })?;

        let result = CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(success = result.success, "command finished");
        Ok(result)
    }
}
