// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// System print strategy: render a receipt PDF and hand it to the OS spooler.
//
// Each attempt renders into its own temporary directory. The directory is a
// `TempDir`, so it is removed when the attempt returns, whichever step failed.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, instrument};

use ticketwerk_core::error::TicketwerkError;
use ticketwerk_document::{ReceiptLayout, TicketPdfWriter, render_qr};

use crate::spooler::Spooler;
use crate::strategy::{PrintFailure, PrintStrategy, PrintableTicket};

pub const SYSTEM_STRATEGY: &str = "system";

pub struct SystemStrategy {
    spooler: Box<dyn Spooler>,
    writer: TicketPdfWriter,
    /// Parent for per-attempt temp dirs; the OS temp dir when unset.
    temp_root: Option<PathBuf>,
}

impl SystemStrategy {
    pub fn new(spooler: Box<dyn Spooler>) -> Self {
        Self {
            spooler,
            writer: TicketPdfWriter::new(),
            temp_root: None,
        }
    }

    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    fn attempt_dir(&self) -> Result<tempfile::TempDir, TicketwerkError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("ticketwerk-");
        let dir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }
}

#[async_trait]
impl PrintStrategy for SystemStrategy {
    fn name(&self) -> &str {
        SYSTEM_STRATEGY
    }

    fn is_available(&self) -> bool {
        true
    }

    #[instrument(skip_all, fields(job_id = %ticket.job_id))]
    async fn print(&self, ticket: &PrintableTicket) -> Result<(), PrintFailure> {
        let dir = self.attempt_dir()?;

        let layout = ReceiptLayout::build(&ticket.ticket, &ticket.token, ticket.printed_at);
        let qr = render_qr(ticket.token.as_str())?;
        let path = dir.path().join(format!("ticket_{}.pdf", file_stem(&ticket.job_id)));
        self.writer
            .write_to_file(&layout, &qr, &path)
            .map_err(|e| PrintFailure::new(format!("PDF conversion failed: {e}")))?;

        debug!(path = %path.display(), "receipt rendered, submitting");
        self.spooler.submit(&path).await?;
        Ok(())
    }
}

/// Job ids come from the network; keep only filename-safe characters.
fn file_stem(job_id: &str) -> String {
    let stem: String = job_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(64)
        .collect();
    if stem.is_empty() { "job".into() } else { stem }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use ticketwerk_core::TicketData;
    use ticketwerk_core::error::Result;

    use super::*;

    /// Records submitted paths and whether the file existed at submit time.
    #[derive(Clone, Default)]
    struct FakeSpooler {
        seen: Arc<Mutex<Vec<(PathBuf, bool)>>>,
        fail: bool,
    }

    #[async_trait]
    impl Spooler for FakeSpooler {
        async fn submit(&self, document: &Path) -> Result<()> {
            let is_pdf = std::fs::read(document).map(|b| b.starts_with(b"%PDF")).unwrap_or(false);
            self.seen.lock().unwrap().push((document.to_path_buf(), is_pdf));
            if self.fail {
                return Err(TicketwerkError::Spooler("lp: no default destination".into()));
            }
            Ok(())
        }
    }

    fn ticket(job_id: &str) -> PrintableTicket {
        let data: TicketData = serde_json::from_str(
            r#"{ "type": "checkout", "id": "bb5f93d3-7489-42fc-a721-be6bdd1780a4", "eventName": "Festival" }"#,
        )
        .unwrap();
        PrintableTicket::from_ticket(job_id, data)
    }

    fn is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn renders_pdf_and_submits_it() {
        let root = tempfile::tempdir().unwrap();
        let spooler = FakeSpooler::default();
        let strategy = SystemStrategy::new(Box::new(spooler.clone())).with_temp_root(root.path());

        strategy.print(&ticket("job-1")).await.unwrap();

        let seen = spooler.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].1, "spooler should receive a finished PDF");
        assert!(seen[0].0.ends_with("ticket_job-1.pdf"));
        assert!(is_empty(root.path()), "temp artifacts must be removed");
    }

    #[tokio::test]
    async fn spooler_failure_still_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let spooler = FakeSpooler {
            fail: true,
            ..FakeSpooler::default()
        };
        let strategy = SystemStrategy::new(Box::new(spooler.clone())).with_temp_root(root.path());

        let failure = strategy.print(&ticket("job-2")).await.unwrap_err();
        assert!(failure.reason.contains("no default destination"));
        assert!(is_empty(root.path()), "temp artifacts must be removed on failure");
    }

    #[tokio::test]
    async fn unusable_temp_root_is_a_print_failure() {
        let root = tempfile::tempdir().unwrap();
        let strategy = SystemStrategy::new(Box::new(FakeSpooler::default())).with_temp_root(root.path().join("missing"));
        assert!(strategy.print(&ticket("job-3")).await.is_err());
    }

    #[test]
    fn job_ids_are_sanitised_for_filenames() {
        assert_eq!(file_stem("../../etc/passwd"), "______etc_passwd");
        assert_eq!(file_stem(""), "job");
        assert_eq!(file_stem("cmf391rge0034"), "cmf391rge0034");
    }
}
