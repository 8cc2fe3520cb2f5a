// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OS print spooler submission (CUPS `lp`).

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use ticketwerk_core::error::{Result, TicketwerkError};

/// Hands a finished document to the operating system's print queue.
#[async_trait]
pub trait Spooler: Send + Sync {
    async fn submit(&self, document: &Path) -> Result<()>;
}

/// Submits files with `lp [-d <queue>] <file>`.
#[derive(Debug, Clone)]
pub struct LpSpooler {
    command: String,
    queue: Option<String>,
    timeout: Duration,
}

impl LpSpooler {
    pub fn new(command: impl Into<String>, queue: Option<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            queue,
            timeout,
        }
    }

    fn command_line(&self, document: &Path) -> Command {
        let mut cmd = Command::new(&self.command);
        if let Some(queue) = &self.queue {
            cmd.arg("-d").arg(queue);
        }
        cmd.arg(document);
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Spooler for LpSpooler {
    #[instrument(skip_all, fields(command = %self.command, document = %document.display()))]
    async fn submit(&self, document: &Path) -> Result<()> {
        let output = tokio::time::timeout(self.timeout, self.command_line(document).output())
            .await
            .map_err(|_| {
                TicketwerkError::Spooler(format!(
                    "`{}` timed out after {}ms",
                    self.command,
                    self.timeout.as_millis()
                ))
            })?
            .map_err(|e| TicketwerkError::Spooler(format!("cannot run `{}`: {e}", self.command)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TicketwerkError::Spooler(format!(
                "`{}` exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(stdout = %stdout.trim(), "spooler output");
        info!("document submitted to spooler");
        Ok(())
    }
}
