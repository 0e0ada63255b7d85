//! On-the-wire frame format for the multicast transport.
//!
//! A [`Message`] is the single frame type exchanged between senders and
//! receivers: DATA and REPAIR carry application payload, ACK/NACK/ACK_REQUEST
//! carry control state in `content`. There is no fragmentation, varint
//! encoding, or sub-typed control body — one fixed header, one opaque
//! content blob capped at [`CONTENT_MAX`] bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Maximum length of a message's opaque content in bytes.
pub const CONTENT_MAX: usize = 256;

/// Fixed header length: 1 (kind) + 4 (sequence_number) + 4 (node_id) + 2 (content_len).
const HEADER_LEN: usize = 1 + 4 + 4 + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Init,
    Data,
    Ack,
    Nack,
    AckRequest,
    Repair,
}

impl MessageKind {
    fn to_byte(self) -> u8 {
        match self {
            MessageKind::Init => 0,
            MessageKind::Data => 1,
            MessageKind::Ack => 2,
            MessageKind::Nack => 3,
            MessageKind::AckRequest => 4,
            MessageKind::Repair => 5,
        }
    }

    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(MessageKind::Init),
            1 => Some(MessageKind::Data),
            2 => Some(MessageKind::Ack),
            3 => Some(MessageKind::Nack),
            4 => Some(MessageKind::AckRequest),
            5 => Some(MessageKind::Repair),
            _ => None,
        }
    }
}

/// A single wire frame.
///
/// `content` is opaque to the core: DATA/REPAIR store the application
/// payload, ACK/NACK/ACK_REQUEST store whatever control encoding the
/// producing side chose (NACK uses `"<start> <end>"` ASCII, ACK/ACK_REQUEST
/// leave it empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub sequence_number: u32,
    pub node_id: u32,
    pub content: Bytes,
}

impl Message {
    pub fn data(sequence_number: u32, node_id: u32, payload: Bytes) -> Self {
        Message {
            kind: MessageKind::Data,
            sequence_number,
            node_id,
            content: truncate(payload),
        }
    }

    pub fn repair(sequence_number: u32, node_id: u32, payload: Bytes) -> Self {
        Message {
            kind: MessageKind::Repair,
            sequence_number,
            node_id,
            content: truncate(payload),
        }
    }

    pub fn ack(ack_seq: u32, node_id: u32) -> Self {
        Message {
            kind: MessageKind::Ack,
            sequence_number: ack_seq,
            node_id,
            content: Bytes::new(),
        }
    }

    pub fn ack_request() -> Self {
        Message {
            kind: MessageKind::AckRequest,
            sequence_number: 0,
            node_id: 0,
            content: Bytes::new(),
        }
    }

    /// Builds a NACK for the inclusive gap `[start, end]`. `content` carries
    /// `"<start> <end>"` in ASCII.
    pub fn nack(node_id: u32, start: u32, end: u32) -> Self {
        Message {
            kind: MessageKind::Nack,
            sequence_number: 0,
            node_id,
            content: Bytes::from(format!("{start} {end}")),
        }
    }

    /// Parses a NACK's `content` back into its `(start, end)` range.
    pub fn nack_range(&self) -> Option<(u32, u32)> {
        if self.kind != MessageKind::Nack {
            return None;
        }
        let text = std::str::from_utf8(&self.content).ok()?;
        let mut parts = text.trim().splitn(2, ' ');
        let start: u32 = parts.next()?.parse().ok()?;
        let end: u32 = parts.next()?.parse().ok()?;
        Some((start, end))
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.content.len());
        buf.put_u8(self.kind.to_byte());
        buf.put_u32(self.sequence_number);
        buf.put_u32(self.node_id);
        buf.put_u16(self.content.len() as u16);
        buf.put_slice(&self.content);
        buf
    }

    /// Decodes a `Message` from `buf`, advancing it past the consumed bytes.
    /// Returns `None` on truncated or otherwise malformed input; never panics.
    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < HEADER_LEN {
            return None;
        }
        let kind = MessageKind::from_byte(buf.get_u8())?;
        let sequence_number = buf.get_u32();
        let node_id = buf.get_u32();
        let content_len = buf.get_u16() as usize;
        if buf.remaining() < content_len {
            return None;
        }
        let mut content = vec![0u8; content_len];
        buf.copy_to_slice(&mut content);
        Some(Message {
            kind,
            sequence_number,
            node_id,
            content: Bytes::from(content),
        })
    }
}

fn truncate(payload: Bytes) -> Bytes {
    if payload.len() <= CONTENT_MAX {
        payload
    } else {
        payload.slice(0..CONTENT_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_roundtrip() {
        let msg = Message::data(7, 3, Bytes::from_static(b"hello"));
        let encoded = msg.encode();
        let decoded = Message::decode(&mut encoded.freeze()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn ack_roundtrip() {
        let msg = Message::ack(42, 9);
        let encoded = msg.encode();
        let decoded = Message::decode(&mut encoded.freeze()).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded.kind, MessageKind::Ack);
    }

    #[test]
    fn ack_request_roundtrip() {
        let msg = Message::ack_request();
        let encoded = msg.encode();
        let decoded = Message::decode(&mut encoded.freeze()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn nack_roundtrip_and_range_parse() {
        let msg = Message::nack(5, 10, 20);
        let encoded = msg.encode();
        let decoded = Message::decode(&mut encoded.freeze()).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded.nack_range(), Some((10, 20)));
    }

    #[test]
    fn repair_roundtrip() {
        let msg = Message::repair(11, 2, Bytes::from_static(b"patched"));
        let encoded = msg.encode();
        let decoded = Message::decode(&mut encoded.freeze()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn decode_rejects_truncated_header() {
        let mut buf = &b"\x01\x00\x00"[..];
        assert!(Message::decode(&mut buf).is_none());
    }

    #[test]
    fn decode_rejects_truncated_content() {
        let msg = Message::data(1, 1, Bytes::from_static(b"0123456789"));
        let mut encoded = msg.encode();
        encoded.truncate(encoded.len() - 3);
        let mut frozen = encoded.freeze();
        assert!(Message::decode(&mut frozen).is_none());
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        let mut buf = BytesMut::new();
        buf.put_u8(0xFF);
        buf.put_u32(0);
        buf.put_u32(0);
        buf.put_u16(0);
        let mut frozen = buf.freeze();
        assert!(Message::decode(&mut frozen).is_none());
    }

    #[test]
    fn decode_never_panics_on_random_short_input() {
        for len in 0..HEADER_LEN {
            let data = vec![0xAAu8; len];
            let mut buf = &data[..];
            assert!(Message::decode(&mut buf).is_none());
        }
    }

    #[test]
    fn oversized_payload_is_truncated_to_content_max() {
        let oversized = Bytes::from(vec![7u8; CONTENT_MAX + 50]);
        let msg = Message::data(1, 1, oversized);
        assert_eq!(msg.content.len(), CONTENT_MAX);
    }

    #[test]
    fn nack_range_rejects_malformed_content() {
        let msg = Message {
            kind: MessageKind::Nack,
            sequence_number: 0,
            node_id: 0,
            content: Bytes::from_static(b"not-a-range"),
        };
        assert_eq!(msg.nack_range(), None);
    }
}
