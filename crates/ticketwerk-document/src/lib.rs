// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ticketwerk-document: ticket rendering for the Ticketwerk print agent.
//
// Provides the receipt layout used by the system print path, QR code rendering
// of ticket tokens, single-page PDF output, and 1-bit rasters for thermal
// printers.

pub mod layout;
pub mod pdf;
pub mod qr;
pub mod raster;
pub mod text;

// Re-export the primary items so callers can use `ticketwerk_document::ReceiptLayout` etc.
pub use layout::{Block, ReceiptLayout, SectorSeats};
pub use pdf::writer::TicketPdfWriter;
pub use qr::{render_qr, render_qr_png, render_qr_sized};
pub use raster::MonoBitmap;
