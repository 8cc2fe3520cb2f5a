// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Ticketwerk print agent.
//
// These mirror the JSON the remote job source sends. Every text field is
// optional on the wire, and a few numeric-looking fields (prices, rows, seat
// numbers) arrive either as JSON numbers or strings, so they are normalised
// into `Scalar`.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::codec::TicketKind;

/// Sector name used for seats that do not carry one.
pub const DEFAULT_SECTOR: &str = "General";

/// Lifecycle states of a remote print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Created remotely, waiting for a device to pick it up.
    Pending,
    /// A device has accepted the job and is printing it.
    Processing,
    /// Printed successfully.
    Completed,
    /// Every print strategy failed; the job carries the error message.
    Failed,
}

impl JobStatus {
    /// Wire keyword for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval state of this device as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceStatus {
    Pending,
    Approved,
    Rejected,
    /// Any status keyword this agent does not know about.
    Other(String),
}

impl DeviceStatus {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl From<String> for DeviceStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => Self::Pending,
            "APPROVED" => Self::Approved,
            "REJECTED" => Self::Rejected,
            _ => Self::Other(value),
        }
    }
}

impl From<DeviceStatus> for String {
    fn from(value: DeviceStatus) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Approved => f.write_str("APPROVED"),
            Self::Rejected => f.write_str("REJECTED"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// A scalar wire value that may arrive as a JSON string, number, or bool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Scalar(pub String);

impl Scalar {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(serde_json::Number),
            Flag(bool),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(s) => Scalar(s),
            Repr::Number(n) => Scalar(n.to_string()),
            Repr::Flag(b) => Scalar(b.to_string()),
        })
    }
}

/// Read an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single seat assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Seat {
    pub sector_name: Option<String>,
    pub row: Option<Scalar>,
    pub seat_number: Option<Scalar>,
}

impl Seat {
    /// Sector this seat belongs to, falling back to [`DEFAULT_SECTOR`].
    pub fn sector(&self) -> &str {
        match self.sector_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => DEFAULT_SECTOR,
        }
    }
}

/// The event listing a ticket was sold under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventPost {
    pub title: Option<String>,
    pub place: Option<String>,
}

/// One individually sold ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SingleTicket {
    /// Raw `type` keyword as sent by the server (`individual`, `ticket`, …).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ticket_type: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    pub title: Option<String>,
    pub event_name: Option<String>,
    pub location: Option<String>,
    pub date_time: Option<String>,
    pub full_name: Option<String>,
    pub price: Option<Scalar>,
    pub post: Option<EventPost>,
    #[serde(deserialize_with = "null_as_default")]
    pub selected_seats: Vec<Seat>,
}

impl SingleTicket {
    /// Event title from the listing, if present.
    pub fn event_title(&self) -> Option<&str> {
        self.post.as_ref().and_then(|p| p.title.as_deref())
    }

    /// Venue from the listing, if present.
    pub fn venue(&self) -> Option<&str> {
        self.post.as_ref().and_then(|p| p.place.as_deref())
    }
}

/// A checkout containing several tickets, printed and encoded as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckoutBundle {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ticket_type: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub dni_passport: Option<String>,
    pub event_name: Option<String>,
    pub location: Option<String>,
    pub date_time: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub tickets: Vec<SingleTicket>,
    pub total_price: Option<Scalar>,
}

/// Ticket payload of a job: exactly one of the two shapes, chosen by the
/// JSON `type` field (`"checkout"` selects the bundle; anything else, or no
/// type at all, is treated as a single ticket).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TicketData {
    Single(SingleTicket),
    Bundle(CheckoutBundle),
}

impl<'de> Deserialize<'de> for TicketData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let type_field = value.get("type").and_then(serde_json::Value::as_str);
        match TicketKind::from_type_field(type_field) {
            TicketKind::Bundle => CheckoutBundle::deserialize(value)
                .map(TicketData::Bundle)
                .map_err(de::Error::custom),
            TicketKind::Individual => SingleTicket::deserialize(value)
                .map(TicketData::Single)
                .map_err(de::Error::custom),
        }
    }
}

impl TicketData {
    /// Identifier encoded into the printed QR token.
    pub fn id(&self) -> &str {
        match self {
            Self::Single(t) => &t.id,
            Self::Bundle(b) => &b.id,
        }
    }

    /// Raw `type` keyword as received.
    pub fn type_field(&self) -> Option<&str> {
        match self {
            Self::Single(t) => t.ticket_type.as_deref(),
            Self::Bundle(b) => b.ticket_type.as_deref(),
        }
    }

    /// Token kind derived from the `type` keyword.
    pub fn kind(&self) -> TicketKind {
        TicketKind::from_type_field(self.type_field())
    }

    pub fn is_bundle(&self) -> bool {
        matches!(self, Self::Bundle(_))
    }

    /// Name of the ticket holder, if known.
    pub fn holder_name(&self) -> Option<&str> {
        match self {
            Self::Single(t) => t.full_name.as_deref(),
            Self::Bundle(b) => b.full_name.as_deref(),
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Single(t) => t.location.as_deref(),
            Self::Bundle(b) => b.location.as_deref(),
        }
    }

    pub fn date_time(&self) -> Option<&str> {
        match self {
            Self::Single(t) => t.date_time.as_deref(),
            Self::Bundle(b) => b.date_time.as_deref(),
        }
    }

    /// All seats on this ticket. For bundles this is the union of every
    /// embedded ticket's seats, in ticket order.
    pub fn seats(&self) -> Vec<&Seat> {
        match self {
            Self::Single(t) => t.selected_seats.iter().collect(),
            Self::Bundle(b) => b
                .tickets
                .iter()
                .flat_map(|t| t.selected_seats.iter())
                .collect(),
        }
    }
}

/// A print job as fetched from the remote job source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub print_type: Option<String>,
    pub ticket_data: TicketData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_ticket_deserializes_from_wire_json() {
        let json = r#"{
            "id": "job-1",
            "printType": "TICKET",
            "ticketData": {
                "type": "ticket",
                "id": "cmf391rge0034ky04b7mkrrix",
                "title": "Entrada General",
                "fullName": "Ana Perez",
                "price": 1500,
                "post": { "title": "Festival", "place": "Estadio" },
                "selectedSeats": [{ "sectorName": "Platea", "row": "F", "seatNumber": 12 }]
            }
        }"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.print_type.as_deref(), Some("TICKET"));
        let TicketData::Single(ticket) = &job.ticket_data else {
            panic!("expected single ticket");
        };
        assert_eq!(ticket.price, Some(Scalar("1500".into())));
        assert_eq!(ticket.event_title(), Some("Festival"));
        assert_eq!(ticket.selected_seats[0].seat_number, Some(Scalar("12".into())));
        assert_eq!(job.ticket_data.kind(), TicketKind::Individual);
    }

    #[test]
    fn checkout_type_selects_bundle_and_aggregates_seats() {
        let json = r#"{
            "type": "checkout",
            "id": "bb5f93d3-7489-42fc-a721-be6bdd1780a4",
            "fullName": "Ana Perez",
            "totalPrice": "3000",
            "tickets": [
                { "id": "t1", "selectedSeats": [{ "sectorName": "A", "row": 1, "seatNumber": 1 }] },
                { "id": "t2", "selectedSeats": [{ "row": 2, "seatNumber": 7 }] },
                { "id": "t3" }
            ]
        }"#;
        let data: TicketData = serde_json::from_str(json).unwrap();
        assert!(data.is_bundle());
        assert_eq!(data.kind(), TicketKind::Bundle);
        let seats = data.seats();
        assert_eq!(seats.len(), 2);
        assert_eq!(seats[0].sector(), "A");
        assert_eq!(seats[1].sector(), DEFAULT_SECTOR);
    }

    #[test]
    fn unknown_or_missing_type_falls_back_to_single() {
        let data: TicketData = serde_json::from_str(r#"{ "type": "vip", "id": "x" }"#).unwrap();
        assert!(!data.is_bundle());
        assert_eq!(data.type_field(), Some("vip"));

        let data: TicketData = serde_json::from_str(r#"{ "id": "y" }"#).unwrap();
        assert_eq!(data.kind(), TicketKind::Individual);
        assert!(data.seats().is_empty());
    }

    #[test]
    fn null_collections_and_ids_read_as_empty() {
        let job: Job = serde_json::from_str(
            r#"{ "id": "job-1", "ticketData": { "type": "ticket", "id": "abc", "selectedSeats": null } }"#,
        )
        .unwrap();
        assert!(job.ticket_data.seats().is_empty());

        let data: TicketData = serde_json::from_str(r#"{ "type": "checkout", "id": "abc", "tickets": null }"#).unwrap();
        assert!(data.is_bundle());
        assert!(data.seats().is_empty());

        let data: TicketData = serde_json::from_str(
            r#"{ "type": "checkout", "id": null, "tickets": [{ "id": null, "selectedSeats": null }] }"#,
        )
        .unwrap();
        assert_eq!(data.id(), "");
        let TicketData::Bundle(bundle) = data else {
            panic!("expected bundle");
        };
        assert_eq!(bundle.tickets.len(), 1);
        assert!(bundle.tickets[0].selected_seats.is_empty());
    }

    #[test]
    fn job_status_uses_wire_keywords() {
        assert_eq!(serde_json::to_string(&JobStatus::Processing).unwrap(), r#""PROCESSING""#);
        let status: JobStatus = serde_json::from_str(r#""FAILED""#).unwrap();
        assert!(status.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }

    #[test]
    fn device_status_keeps_unknown_keywords() {
        let status: DeviceStatus = serde_json::from_str(r#""SUSPENDED""#).unwrap();
        assert_eq!(status, DeviceStatus::Other("SUSPENDED".into()));
        assert!(!status.is_approved());
        let approved: DeviceStatus = serde_json::from_str(r#""APPROVED""#).unwrap();
        assert!(approved.is_approved());
    }
}
