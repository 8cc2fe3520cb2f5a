// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ticketwerk core: types, identifier codec, configuration, and error
// definitions shared across all crates.

pub mod codec;
pub mod config;
pub mod error;
pub mod human_errors;
pub mod types;

pub use codec::{DecodedToken, EncodedToken, InvalidToken, TicketKind};
pub use config::AgentConfig;
pub use error::TicketwerkError;
pub use types::*;
