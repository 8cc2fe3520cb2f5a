// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The print strategy seam.
//
// Each strategy is one way of getting a ticket onto paper. Strategies never
// decide what happens to the job; they report success or a `PrintFailure`
// and the chain moves on.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use thiserror::Error;
use ticketwerk_core::codec::tag_and_encode;
use ticketwerk_core::error::TicketwerkError;
use ticketwerk_core::{EncodedToken, TicketData};

/// Everything a strategy needs to print one job.
#[derive(Debug, Clone)]
pub struct PrintableTicket {
    pub job_id: String,
    pub ticket: TicketData,
    /// Token embedded in the QR code and printed beneath it.
    pub token: EncodedToken,
    pub printed_at: DateTime<Local>,
}

impl PrintableTicket {
    pub fn new(job_id: impl Into<String>, ticket: TicketData, token: EncodedToken, printed_at: DateTime<Local>) -> Self {
        Self {
            job_id: job_id.into(),
            ticket,
            token,
            printed_at,
        }
    }

    /// Derive the token from the ticket's type and id, stamped now.
    pub fn from_ticket(job_id: impl Into<String>, ticket: TicketData) -> Self {
        let token = tag_and_encode(ticket.kind(), ticket.id());
        Self::new(job_id, ticket, token, Local::now())
    }
}

/// A single strategy's failure. Never fatal to the job on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct PrintFailure {
    pub reason: String,
}

impl PrintFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl From<TicketwerkError> for PrintFailure {
    fn from(err: TicketwerkError) -> Self {
        Self::new(err.to_string())
    }
}

/// One way of printing a ticket.
#[async_trait]
pub trait PrintStrategy: Send + Sync {
    /// Short name used in logs and composite failure reasons.
    fn name(&self) -> &str;

    /// Whether this strategy can be attempted at all. Unavailable strategies
    /// are skipped without counting as an attempt.
    fn is_available(&self) -> bool;

    async fn print(&self, ticket: &PrintableTicket) -> Result<(), PrintFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_follows_ticket_type() {
        let bundle: TicketData = serde_json::from_str(r#"{ "type": "checkout", "id": "abc" }"#).unwrap();
        let printable = PrintableTicket::from_ticket("job-1", bundle);
        assert_eq!(printable.token.as_str(), "bzyx");

        let single: TicketData = serde_json::from_str(r#"{ "id": "abc" }"#).unwrap();
        assert_eq!(PrintableTicket::from_ticket("job-2", single).token.as_str(), "izyx");
    }

    #[test]
    fn failure_from_core_error_keeps_message() {
        let failure = PrintFailure::from(TicketwerkError::Spooler("lp exited with 1".into()));
        assert_eq!(failure.to_string(), "print spooler error: lp exited with 1");
    }
}
