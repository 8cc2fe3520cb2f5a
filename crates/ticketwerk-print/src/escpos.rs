// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ESC/POS command encoding for 58 mm thermal receipt printers.
//
// Only the small command subset every Epson-compatible head understands is
// used: initialise, alignment, bold, character size, raster bit image
// (`GS v 0`), line feeds and paper cut.

use ticketwerk_core::{Scalar, SingleTicket, TicketData};
use ticketwerk_document::MonoBitmap;
use ticketwerk_document::text::{ascii_fold, wrap_text};

use crate::strategy::PrintableTicket;

const ESC: u8 = 0x1b;
const GS: u8 = 0x1d;
const LF: u8 = 0x0a;

/// Characters per line in font A on a 58 mm head.
pub const DEFAULT_COLUMNS: usize = 32;

const MISSING: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left = 0,
    Center = 1,
    Right = 2,
}

/// Incremental ESC/POS byte stream.
#[derive(Debug, Clone)]
pub struct EscPosBuilder {
    buf: Vec<u8>,
    columns: usize,
}

impl EscPosBuilder {
    /// Start a job with `ESC @`.
    pub fn new(columns: usize) -> Self {
        let mut builder = Self {
            buf: Vec::with_capacity(4096),
            columns: columns.max(1),
        };
        builder.buf.extend_from_slice(&[ESC, b'@']);
        builder
    }

    pub fn align(&mut self, align: Align) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, b'a', align as u8]);
        self
    }

    pub fn bold(&mut self, on: bool) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, b'E', u8::from(on)]);
        self
    }

    /// Character magnification, 1..=8 in each direction.
    pub fn size(&mut self, width: u8, height: u8) -> &mut Self {
        let w = width.clamp(1, 8) - 1;
        let h = height.clamp(1, 8) - 1;
        self.buf.extend_from_slice(&[GS, b'!', (w << 4) | h]);
        self
    }

    /// Print text, folded to ASCII and wrapped at the column width. Leading
    /// spaces are kept as a hanging indent on every wrapped line.
    pub fn line(&mut self, text: &str) -> &mut Self {
        let folded = ascii_fold(text);
        let body = folded.trim_start_matches(' ');
        let indent = &folded[..folded.len() - body.len()];
        let width = self.columns.saturating_sub(indent.len()).max(1);

        for wrapped in wrap_text(body, width) {
            if !wrapped.is_empty() {
                self.buf.extend_from_slice(indent.as_bytes());
            }
            self.buf.extend_from_slice(wrapped.as_bytes());
            self.buf.push(LF);
        }
        self
    }

    pub fn divider(&mut self) -> &mut Self {
        let rule = "-".repeat(self.columns);
        self.buf.extend_from_slice(rule.as_bytes());
        self.buf.push(LF);
        self
    }

    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, b'd', lines]);
        self
    }

    /// Raster bit image, `GS v 0` normal density.
    pub fn raster(&mut self, bitmap: &MonoBitmap) -> &mut Self {
        let bytes_per_row = bitmap.bytes_per_row() as u16;
        let rows = bitmap.height() as u16;
        self.buf.extend_from_slice(&[GS, b'v', b'0', 0]);
        self.buf.extend_from_slice(&bytes_per_row.to_le_bytes());
        self.buf.extend_from_slice(&rows.to_le_bytes());
        self.buf.extend_from_slice(bitmap.data());
        self.buf.push(LF);
        self
    }

    /// Feed past the tear bar and partial-cut (`GS V 66 n`).
    pub fn cut(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[GS, b'V', 66, 3]);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.buf.clone()
    }
}

/// Receipt-level options for the thermal printer.
#[derive(Debug, Clone)]
pub struct ReceiptOptions {
    /// Bold centred title at the top of every receipt.
    pub header: String,
    pub columns: usize,
}

impl Default for ReceiptOptions {
    fn default() -> Self {
        Self {
            header: "TICKET".into(),
            columns: DEFAULT_COLUMNS,
        }
    }
}

/// Encode a full thermal receipt for `ticket` with `qr` as the code image.
pub fn build_receipt(ticket: &PrintableTicket, qr: &MonoBitmap, options: &ReceiptOptions) -> Vec<u8> {
    let mut out = EscPosBuilder::new(options.columns);

    out.align(Align::Center).size(1, 1).bold(true).line(&options.header).bold(false);
    out.divider();
    out.align(Align::Left);

    match &ticket.ticket {
        TicketData::Bundle(bundle) => {
            out.line(&format!("Customer: {}", or_missing(bundle.full_name.as_deref())));
            out.line(&format!("Email: {}", or_missing(bundle.email.as_deref())));
            out.line(&format!("Phone: {}", or_missing(bundle.phone.as_deref())));
            out.line(&format!("ID document: {}", or_missing(bundle.dni_passport.as_deref())));
            out.divider();

            for (index, embedded) in bundle.tickets.iter().enumerate() {
                out.line(&format!("Ticket {}:", index + 1));
                ticket_block(&mut out, embedded, "  ");
                out.line("");
            }

            out.divider();
            out.bold(true)
                .line(&format!("Total: ${}", price(bundle.total_price.as_ref())))
                .bold(false);
        }
        TicketData::Single(single) => {
            out.line(&format!("Customer: {}", or_missing(single.full_name.as_deref())));
            out.line(&format!("Ticket: {}", or_missing(single.title.as_deref())));
            ticket_block_details(&mut out, single, "");
        }
    }

    out.divider();
    out.align(Align::Center);
    out.raster(qr);
    out.line("");
    out.line(ticket.token.as_str());
    out.line("");
    out.divider();
    out.line(&format!("Printed: {}", ticket.printed_at.format("%d/%m/%Y %H:%M:%S")));
    out.line("Keep this ticket");
    out.feed(3).cut();

    out.build()
}

fn ticket_block(out: &mut EscPosBuilder, ticket: &SingleTicket, indent: &str) {
    out.line(&format!("{indent}{}", or_missing(ticket.title.as_deref())));
    ticket_block_details(out, ticket, indent);
}

fn ticket_block_details(out: &mut EscPosBuilder, ticket: &SingleTicket, indent: &str) {
    out.line(&format!("{indent}Event: {}", or_missing(ticket.event_title())));
    out.line(&format!("{indent}Venue: {}", or_missing(ticket.venue())));
    out.line(&format!("{indent}Price: ${}", price(ticket.price.as_ref())));
}

fn or_missing(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => MISSING,
    }
}

fn price(value: Option<&Scalar>) -> &str {
    or_missing(value.map(Scalar::as_str))
}
