// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-job state machine: PENDING -> PROCESSING -> COMPLETED | FAILED.
//
// Status pushes are telemetry. A failed push is logged and never changes what
// happens on paper. The PROCESSING push completes before any strategy runs;
// the terminal push starts only after the chain has resolved.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use ticketwerk_core::{Job, JobStatus};
use ticketwerk_print::{PrintableTicket, StrategyChain};

use crate::remote::{FetchedJob, JobSource};

/// What happened to one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job_id: String,
    /// `Completed` or `Failed`.
    pub status: JobStatus,
    pub strategy: Option<String>,
    pub error: Option<String>,
}

pub struct JobProcessor {
    source: Arc<dyn JobSource>,
    chain: StrategyChain,
}

impl JobProcessor {
    pub fn new(source: Arc<dyn JobSource>, chain: StrategyChain) -> Self {
        Self { source, chain }
    }

    pub fn chain(&self) -> &StrategyChain {
        &self.chain
    }

    /// Process one entry of a fetched batch. An unreadable entry is never
    /// printed but still ends `Failed`.
    pub async fn process_entry(&self, entry: &FetchedJob) -> JobReport {
        match entry {
            FetchedJob::Ready(job) => self.process(job).await,
            FetchedJob::Unreadable { id, reason } => self.reject(id, reason).await,
        }
    }

    #[instrument(skip_all, fields(job_id = %job.id))]
    pub async fn process(&self, job: &Job) -> JobReport {
        self.push(&job.id, JobStatus::Processing, None).await;

        let ticket = PrintableTicket::from_ticket(job.id.clone(), job.ticket_data.clone());
        info!(token = %ticket.token, kind = %ticket.ticket.kind(), "printing job");

        let outcome = self.chain.print(&ticket).await;

        let report = if outcome.success {
            JobReport {
                job_id: job.id.clone(),
                status: JobStatus::Completed,
                strategy: outcome.strategy,
                error: None,
            }
        } else {
            let reason = outcome.error.unwrap_or_else(|| "print failed".into());
            error!(reason = %reason, attempted = ?outcome.attempted, "job failed on every print strategy");
            JobReport {
                job_id: job.id.clone(),
                status: JobStatus::Failed,
                strategy: None,
                error: Some(reason),
            }
        };

        self.push(&job.id, report.status, report.error.as_deref()).await;
        report
    }

    #[instrument(skip(self, reason))]
    async fn reject(&self, job_id: &str, reason: &str) -> JobReport {
        self.push(job_id, JobStatus::Processing, None).await;
        error!(reason, "job payload unreadable");
        self.push(job_id, JobStatus::Failed, Some(reason)).await;
        JobReport {
            job_id: job_id.to_string(),
            status: JobStatus::Failed,
            strategy: None,
            error: Some(reason.to_string()),
        }
    }

    async fn push(&self, job_id: &str, status: JobStatus, error_message: Option<&str>) {
        if let Err(err) = self.source.update_job_status(job_id, status, error_message).await {
            warn!(status = %status, error = %err, "status update failed, continuing");
        }
    }
}
