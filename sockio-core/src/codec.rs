//! Wire codec for Socket.IO frames
//!
//! The grammar is positional: every field sits at a fixed place relative to
//! the previous one, and optional fields are recognised by their first
//! character (`/` opens a namespace, a digit opens an id, anything else starts
//! the JSON payload).
//!
//! ```text
//! <transport digit>[<socket digit>][<attachments>-][<namespace>,][<id>][<json>]
//! ```
//!
//! # Decoding
//!
//! [`decode`] walks the text once, left to right, with a cursor pointing at
//! the last consumed byte. Only the outer kind is mandatory: an empty frame or
//! a non-digit first character is a [`Error::MalformedPacket`]. A payload that
//! is not valid JSON is logged and dropped, the packet itself is still
//! returned.
//!
//! # Encoding
//!
//! [`encode`] writes the fields back in the same order and never fails.
//!
//! # Examples
//!
//! ```rust
//! use sockio_core::{codec, SocketPacketKind};
//!
//! let packet = codec::decode(r#"42/chat,12["hello",1]"#).unwrap();
//! assert_eq!(packet.socket_kind(), Some(SocketPacketKind::Event));
//! assert_eq!(packet.namespace(), "/chat");
//! assert_eq!(packet.id(), Some(12));
//!
//! assert_eq!(codec::encode(&packet), r#"42/chat,12["hello",1]"#);
//! ```

use crate::error::{Error, Result};
use crate::packet::{Packet, SocketPacketKind, TransportPacketKind, DEFAULT_NAMESPACE};

/// Decode one frame of wire text into a [`Packet`]
///
/// # Errors
///
/// Returns `Error::MalformedPacket` when the frame is empty or when the
/// transport (or, for messages, socket) kind is not an ASCII digit. Digits
/// outside the known range decode to the `Unknown` kinds instead.
pub fn decode(text: &str) -> Result<Packet> {
    tracing::debug!(frame = %text, "Decoding frame");

    let bytes = text.as_bytes();
    let len = bytes.len();

    let first = *bytes
        .first()
        .ok_or_else(|| Error::MalformedPacket("empty frame".to_string()))?;
    let transport_kind = TransportPacketKind::from_digit(kind_digit(first, "transport")?);
    let mut packet = Packet::new(transport_kind);
    let mut offset = 0;

    if transport_kind == TransportPacketKind::Message && len > 1 {
        offset = 1;
        let socket_kind = SocketPacketKind::from_digit(kind_digit(bytes[1], "socket")?);
        packet = packet.with_socket_kind(socket_kind);
    }

    // Bare control frames such as "0", "3" or "40"
    if len <= 2 {
        tracing::debug!(packet = %packet, "Decoded frame");
        return Ok(packet);
    }

    if packet.socket_kind().is_some_and(SocketPacketKind::is_binary) {
        let start = offset + 1;
        let end = digit_run_end(bytes, start);
        if end > start {
            match text[start..end].parse::<u64>() {
                Ok(count) => packet = packet.with_attachments(count),
                Err(e) => tracing::warn!(error = %e, "Attachment count out of range"),
            }
            offset = end - 1;
        }
        if end < len && bytes[end] == b'-' {
            offset = end;
        }
    }

    if offset + 1 < len && bytes[offset + 1] == b'/' {
        let start = offset + 1;
        let end = text[start..].find(',').map_or(len, |i| start + i);
        packet = packet.with_namespace(&text[start..end]);
        offset = end.min(len - 1);
    }

    if offset + 1 < len && bytes[offset + 1].is_ascii_digit() {
        let start = offset + 1;
        let end = digit_run_end(bytes, start);
        match text[start..end].parse::<u64>() {
            Ok(id) => packet = packet.with_id(id),
            Err(e) => tracing::warn!(error = %e, "Packet id out of range"),
        }
        offset = end - 1;
    }

    // A payload needs at least two characters left after the cursor
    offset += 1;
    if offset + 1 < len {
        let raw = &text[offset..];
        match serde_json::from_str(raw) {
            Ok(payload) => packet = packet.with_payload(payload),
            Err(e) => {
                let anomaly = Error::PayloadParse(e.to_string());
                tracing::warn!(error = %anomaly, payload = %raw, "Dropping unparseable payload");
            }
        }
    }

    tracing::debug!(packet = %packet, "Decoded frame");
    Ok(packet)
}

/// Encode a [`Packet`] into wire text
///
/// Fields are written in decode order: transport digit, socket digit,
/// `<attachments>-` for binary kinds, `<namespace>,` when not `/`, the id,
/// then the JSON payload. `Unknown` kinds have no digit and are skipped.
pub fn encode(packet: &Packet) -> String {
    let mut out = String::new();

    if let Some(digit) = packet.transport_kind().digit() {
        out.push(char::from(b'0' + digit));
    }

    if let Some(kind) = packet.socket_kind() {
        if let Some(digit) = kind.digit() {
            out.push(char::from(b'0' + digit));
        }
        if kind.is_binary() {
            out.push_str(&packet.attachments().unwrap_or(0).to_string());
            out.push('-');
        }
    }

    let namespace = packet.namespace();
    if !namespace.is_empty() && namespace != DEFAULT_NAMESPACE {
        out.push_str(namespace);
        out.push(',');
    }

    if let Some(id) = packet.id() {
        out.push_str(&id.to_string());
    }

    if let Some(payload) = packet.payload() {
        out.push_str(&payload.to_string());
    }

    tracing::debug!(frame = %out, "Encoded packet");
    out
}

fn kind_digit(byte: u8, field: &str) -> Result<u8> {
    if byte.is_ascii_digit() {
        Ok(byte - b'0')
    } else {
        Err(Error::MalformedPacket(format!(
            "{} kind is not a digit: {:?}",
            field,
            char::from(byte)
        )))
    }
}

/// Index one past the last ASCII digit of the run starting at `start`
fn digit_run_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    end
}
