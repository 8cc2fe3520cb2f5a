// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Receipt layout for the rasterised (system spooler) ticket.
//
// The layout is computed from the ticket data once and then handed to a
// renderer as a flat list of blocks, top to bottom.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use ticketwerk_core::{EncodedToken, Seat, TicketData};

/// Event title used when a bundle carries no event name.
pub const BUNDLE_FALLBACK_TITLE: &str = "Multiple events";
/// Event title used when a single ticket carries neither event name nor title.
pub const SINGLE_FALLBACK_TITLE: &str = "Event";
pub const BUNDLE_BANNER: &str = "*** MULTIPLE TICKET ***";
pub const SCAN_HINT: &str = "Scan this code at the event";

/// Seats of one sector, in the order they appeared in the ticket data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorSeats {
    pub sector: String,
    pub seats: Vec<String>,
}

/// One visual element of the receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    /// Secondary line under the heading (venue).
    Subtitle(String),
    /// Bold body line.
    Emphasis(String),
    Text(String),
    /// Full-width banner between dashed rules.
    Banner(String),
    /// The QR code image.
    Qr,
    /// Monospaced footer line.
    Mono(String),
    Divider,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLayout {
    pub event_name: String,
    pub location: Option<String>,
    /// `dd/mm/yyyy HH:MM` when the ticket's date parsed.
    pub date_line: Option<String>,
    pub is_bundle: bool,
    pub token: String,
    pub sectors: Vec<SectorSeats>,
    pub holder_name: Option<String>,
    /// `dd/mm/yyyy` of the print run.
    pub printed_on: String,
}

impl ReceiptLayout {
    pub fn build(ticket: &TicketData, token: &EncodedToken, printed_at: DateTime<Local>) -> Self {
        let event_name = match ticket {
            TicketData::Bundle(b) => non_blank(b.event_name.as_deref()).unwrap_or(BUNDLE_FALLBACK_TITLE),
            TicketData::Single(t) => non_blank(t.event_name.as_deref())
                .or_else(|| non_blank(t.title.as_deref()))
                .unwrap_or(SINGLE_FALLBACK_TITLE),
        };

        let location = match ticket {
            TicketData::Single(t) => non_blank(t.location.as_deref()).or_else(|| non_blank(t.venue())),
            TicketData::Bundle(b) => non_blank(b.location.as_deref()),
        };

        Self {
            event_name: event_name.to_string(),
            location: location.map(str::to_string),
            date_line: ticket.date_time().and_then(format_date_line),
            is_bundle: ticket.is_bundle(),
            token: token.as_str().to_string(),
            sectors: group_by_sector(ticket.seats()),
            holder_name: non_blank(ticket.holder_name()).map(str::to_string),
            printed_on: printed_at.format("%d/%m/%Y").to_string(),
        }
    }

    /// Flatten the layout into renderable blocks.
    pub fn blocks(&self) -> Vec<Block> {
        let mut blocks = vec![Block::Heading(self.event_name.clone())];
        if let Some(location) = &self.location {
            blocks.push(Block::Subtitle(location.clone()));
        }
        if let Some(date) = &self.date_line {
            blocks.push(Block::Emphasis(date.clone()));
        }
        if self.is_bundle {
            blocks.push(Block::Banner(BUNDLE_BANNER.into()));
        }

        blocks.push(Block::Qr);

        if !self.sectors.is_empty() {
            blocks.push(Block::Text("Seats:".into()));
            for sector in &self.sectors {
                blocks.push(Block::Emphasis(sector.sector.clone()));
                blocks.push(Block::Text(sector.seats.join("  ")));
            }
        }

        if let Some(holder) = &self.holder_name {
            blocks.push(Block::Emphasis(holder.clone()));
        }

        blocks.push(Block::Divider);
        blocks.push(Block::Text(SCAN_HINT.into()));
        blocks.push(Block::Mono(format!("ID: {}", self.token)));
        blocks.push(Block::Text(self.printed_on.clone()));
        blocks
    }
}

/// Group seats by sector, keeping sectors in first-seen order.
pub fn group_by_sector<'a>(seats: impl IntoIterator<Item = &'a Seat>) -> Vec<SectorSeats> {
    let mut groups: Vec<SectorSeats> = Vec::new();
    for seat in seats {
        let label = seat_label(seat);
        match groups.iter_mut().find(|g| g.sector == seat.sector()) {
            Some(group) => group.seats.push(label),
            None => groups.push(SectorSeats {
                sector: seat.sector().to_string(),
                seats: vec![label],
            }),
        }
    }
    groups
}

/// `Row F Seat 12`, or whichever half is present.
pub fn seat_label(seat: &Seat) -> String {
    let row = seat.row.as_ref().map(|r| r.as_str()).filter(|r| !r.is_empty());
    let number = seat.seat_number.as_ref().map(|n| n.as_str()).filter(|n| !n.is_empty());
    match (row, number) {
        (Some(row), Some(number)) => format!("Row {row} Seat {number}"),
        (Some(row), None) => format!("Row {row}"),
        (None, Some(number)) => format!("Seat {number}"),
        (None, None) => "Unnumbered".to_string(),
    }
}

/// Format an event timestamp as `dd/mm/yyyy HH:MM` in local time.
///
/// Accepts RFC 3339 (converted to local time) and zone-less
/// `YYYY-MM-DD[T ]HH:MM[:SS]` (taken as local). Anything else yields `None`.
pub fn format_date_line(raw: &str) -> Option<String> {
    const FORMAT: &str = "%d/%m/%Y %H:%M";
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).format(FORMAT).to_string());
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|dt| dt.format(FORMAT).to_string())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
