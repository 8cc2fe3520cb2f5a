// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Thermal (ESC/POS) print strategy.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use ticketwerk_document::raster::{MonoBitmap, THERMAL_DOTS_58MM};
use ticketwerk_document::render_qr;

use crate::device::{LinePrinter, ThermalDevice};
use crate::escpos::{ReceiptOptions, build_receipt};
use crate::strategy::{PrintFailure, PrintStrategy, PrintableTicket};

pub const THERMAL_STRATEGY: &str = "thermal";

/// Prints directly to a thermal receipt printer. Only available when the
/// device was opened at startup.
pub struct ThermalStrategy {
    device: Option<Mutex<Box<dyn ThermalDevice>>>,
    options: ReceiptOptions,
    timeout: Duration,
}

impl ThermalStrategy {
    pub fn new(device: Box<dyn ThermalDevice>, options: ReceiptOptions, timeout: Duration) -> Self {
        Self {
            device: Some(Mutex::new(device)),
            options,
            timeout,
        }
    }

    /// A strategy with no device. It is never attempted.
    pub fn unavailable() -> Self {
        Self {
            device: None,
            options: ReceiptOptions::default(),
            timeout: Duration::ZERO,
        }
    }

    /// Open the line printer at `path`. A missing or unwritable device
    /// yields an unavailable strategy rather than an error.
    pub async fn open(path: &Path, options: ReceiptOptions, timeout: Duration) -> Self {
        match LinePrinter::open(path, timeout).await {
            Ok(printer) => Self::new(Box::new(printer), options, timeout),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "thermal printer not available, using system printing only");
                Self::unavailable()
            }
        }
    }
}

#[async_trait]
impl PrintStrategy for ThermalStrategy {
    fn name(&self) -> &str {
        THERMAL_STRATEGY
    }

    fn is_available(&self) -> bool {
        self.device.is_some()
    }

    #[instrument(skip_all, fields(job_id = %ticket.job_id))]
    async fn print(&self, ticket: &PrintableTicket) -> Result<(), PrintFailure> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| PrintFailure::new("thermal printer not available"))?;

        let qr = render_qr(ticket.token.as_str())?;
        let bitmap = MonoBitmap::fit_width(&qr, THERMAL_DOTS_58MM);
        let receipt = build_receipt(ticket, &bitmap, &self.options);

        let mut device = device.lock().await;
        let target = device.describe();
        tokio::time::timeout(self.timeout, device.write_all(&receipt))
            .await
            .map_err(|_| PrintFailure::new(format!("thermal write timed out after {}ms", self.timeout.as_millis())))??;

        info!(device = %target, bytes = receipt.len(), "thermal receipt written");
        Ok(())
    }
}
