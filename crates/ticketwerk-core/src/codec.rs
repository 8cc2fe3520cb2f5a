// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reversible identifier codec for printed QR tokens.
//
// A token is `<kind><body>`: one character naming the ticket kind (`i` for an
// individual ticket, `b` for a checkout bundle) followed by the identifier
// with its hyphens stripped and every character passed through a fixed
// substitution table. The table is an involution (a↔z, 0↔9, -↔_, …), so the
// same mapping both encodes and decodes.
//
// Scanners in the field still see two older payload shapes, both of which are
// recognised here:
//   - full URLs of the form `https://host/{i|b}/<id>`
//   - bare hyphenated UUIDs, which predate the codec and are reported as
//     `InvalidToken::LegacyUuid`.

use thiserror::Error;
use uuid::Uuid;

/// Which kind of ticket a token refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketKind {
    /// A single sold ticket.
    Individual,
    /// A checkout bundle holding several tickets.
    Bundle,
}

impl TicketKind {
    /// Map a ticket's JSON `type` keyword to a token kind.
    ///
    /// Only `"checkout"` selects [`TicketKind::Bundle`]. `"individual"`,
    /// `"ticket"`, a missing type and any unrecognised keyword all map to
    /// [`TicketKind::Individual`].
    pub fn from_type_field(type_field: Option<&str>) -> Self {
        match type_field {
            Some("checkout") => Self::Bundle,
            Some("individual") | Some("ticket") | None => Self::Individual,
            Some(other) => {
                tracing::debug!(ticket_type = other, "unrecognised ticket type, tagging as individual");
                Self::Individual
            }
        }
    }

    /// The leading token character for this kind.
    pub fn tag(&self) -> char {
        match self {
            Self::Individual => 'i',
            Self::Bundle => 'b',
        }
    }

    /// Inverse of [`TicketKind::tag`].
    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'i' => Some(Self::Individual),
            'b' => Some(Self::Bundle),
            _ => None,
        }
    }

    /// Human-readable name used in logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Bundle => "bundle",
        }
    }
}

impl std::fmt::Display for TicketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tagged, substitution-encoded token ready to be embedded in a QR code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedToken(String);

impl EncodedToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EncodedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EncodedToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Result of successfully decoding a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    pub kind: TicketKind,
    pub identifier: String,
}

/// Why a scanned string is not a valid encoded token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidToken {
    #[error("token is empty")]
    Empty,

    #[error("plain UUID from a pre-codec payload")]
    LegacyUuid,

    #[error("unknown token kind '{0}'")]
    UnknownKind(char),
}

/// Substitute a single character through the involutive table.
///
/// Letters mirror the alphabet, digits mirror 0 to 9, and `-`/`_` swap.
/// Anything else is returned unchanged.
pub fn substitute(c: char) -> char {
    match c {
        'a'..='z' => (b'a' + (b'z' - c as u8)) as char,
        '0'..='9' => (b'0' + (b'9' - c as u8)) as char,
        '-' => '_',
        '_' => '-',
        other => other,
    }
}

/// Encode an identifier body: lower-case, strip hyphens, substitute.
pub fn encode(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|&c| c != '-')
        .flat_map(char::to_lowercase)
        .map(substitute)
        .collect()
}

/// Decode an identifier body, restoring UUID hyphenation when the decoded
/// text is exactly 32 lowercase hex characters.
pub fn decode(body: &str) -> String {
    let decoded: String = body.chars().map(substitute).collect();
    if is_simple_hex_uuid(&decoded) {
        format!(
            "{}-{}-{}-{}-{}",
            &decoded[0..8],
            &decoded[8..12],
            &decoded[12..16],
            &decoded[16..20],
            &decoded[20..32]
        )
    } else {
        decoded
    }
}

/// Build the printable token for a ticket.
pub fn tag_and_encode(kind: TicketKind, identifier: &str) -> EncodedToken {
    let mut token = String::with_capacity(identifier.len() + 1);
    token.push(kind.tag());
    token.push_str(&encode(identifier));
    EncodedToken(token)
}

/// Decode a scanned token back into its kind and identifier.
///
/// Accepts the current `<kind><body>` format and the historical URL format.
/// Bare hyphenated UUIDs are rejected as [`InvalidToken::LegacyUuid`].
pub fn detag_and_decode(token: &str) -> Result<DecodedToken, InvalidToken> {
    if let Some(decoded) = parse_legacy_url(token) {
        return Ok(decoded);
    }

    if is_hyphenated_uuid(token) {
        return Err(InvalidToken::LegacyUuid);
    }

    let mut chars = token.chars();
    let tag = chars.next().ok_or(InvalidToken::Empty)?;
    let kind = TicketKind::from_tag(tag).ok_or(InvalidToken::UnknownKind(tag))?;

    Ok(DecodedToken {
        kind,
        identifier: decode(chars.as_str()),
    })
}

/// Match `http(s)://<host>/<i|b>/<id>[/]`. The id is returned verbatim.
fn parse_legacy_url(token: &str) -> Option<DecodedToken> {
    let rest = token
        .strip_prefix("https://")
        .or_else(|| token.strip_prefix("http://"))?;
    let rest = rest.strip_suffix('/').unwrap_or(rest);

    let mut parts = rest.split('/');
    let host = parts.next()?;
    let tag = parts.next()?;
    let identifier = parts.next()?;
    if host.is_empty() || identifier.is_empty() || parts.next().is_some() {
        return None;
    }

    let mut tag_chars = tag.chars();
    let kind = TicketKind::from_tag(tag_chars.next()?)?;
    if tag_chars.next().is_some() {
        return None;
    }

    Some(DecodedToken {
        kind,
        identifier: identifier.to_string(),
    })
}

/// Standard 8-4-4-4-12 UUID text, any case.
fn is_hyphenated_uuid(s: &str) -> bool {
    s.len() == 36 && s.as_bytes()[8] == b'-' && Uuid::try_parse(s).is_ok()
}

fn is_simple_hex_uuid(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
