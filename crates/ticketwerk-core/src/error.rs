// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Ticketwerk.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all Ticketwerk operations.
#[derive(Debug, Error)]
pub enum TicketwerkError {
    // -- Startup (fatal) --
    #[error("configuration file not found: {}", .0.display())]
    ConfigurationMissing(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("device credentials not found: {}", .0.display())]
    CredentialsMissing(PathBuf),

    // -- Remote job source --
    #[error("remote service unreachable: {0}")]
    RemoteUnreachable(String),

    #[error("remote service rejected request: {0}")]
    RemoteRejected(String),

    // -- Printing --
    #[error("print failed: {0}")]
    PrintFailure(String),

    #[error("thermal device error: {0}")]
    Device(String),

    #[error("print spooler error: {0}")]
    Spooler(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- OS collaborators --
    #[error("network information unavailable: {0}")]
    NetworkInfoUnavailable(String),

    #[error("command `{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },

    // -- Plumbing --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TicketwerkError {
    /// Whether the process cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationMissing(_) | Self::InvalidConfiguration(_) | Self::CredentialsMissing(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TicketwerkError>;
