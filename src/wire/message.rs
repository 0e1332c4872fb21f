//! Message envelopes
//!
//! Every message is a 12-byte envelope followed by its payload:
//!
//! ```text
//! +---------+----------------------+-------------------+
//! | tag (4) | length (8 hex ASCII) | payload (length)  |
//! +---------+----------------------+-------------------+
//! ```
//!
//! The length is uppercase and zero-padded when written. Lowercase hex
//! is accepted on read.

use std::fmt;

use super::errors::{WireError, WireResult};

/// Envelope size: tag plus hex length
pub const ENVELOPE_SIZE: usize = 12;

/// Largest payload the length field may declare
pub const MAX_PAYLOAD_LEN: usize = i32::MAX as usize;

/// Message type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// `KIT1`, client handshake, empty payload
    Handshake,
    /// `JSON`, query request
    Json,
    /// `VEC_`, one vector, or empty as the page terminator
    Vector,
    /// `BYE_`, fragment stream complete
    Bye,
    /// `ERR_`, UTF-8 error text from the server
    Error,
}

impl MessageType {
    pub fn tag(&self) -> &'static [u8; 4] {
        match self {
            MessageType::Handshake => b"KIT1",
            MessageType::Json => b"JSON",
            MessageType::Vector => b"VEC_",
            MessageType::Bye => b"BYE_",
            MessageType::Error => b"ERR_",
        }
    }

    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"KIT1" => Some(MessageType::Handshake),
            b"JSON" => Some(MessageType::Json),
            b"VEC_" => Some(MessageType::Vector),
            b"BYE_" => Some(MessageType::Bye),
            b"ERR_" => Some(MessageType::Error),
            _ => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.tag()))
    }
}

/// A complete framed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageType,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(kind: MessageType, payload: Vec<u8>) -> Self {
        Self { kind, payload }
    }

    pub fn handshake() -> Self {
        Self::new(MessageType::Handshake, Vec::new())
    }

    pub fn json(payload: Vec<u8>) -> Self {
        Self::new(MessageType::Json, payload)
    }

    pub fn vector(payload: Vec<u8>) -> Self {
        Self::new(MessageType::Vector, payload)
    }

    /// Zero-length `VEC_`
    pub fn page_end() -> Self {
        Self::new(MessageType::Vector, Vec::new())
    }

    pub fn bye() -> Self {
        Self::new(MessageType::Bye, Vec::new())
    }

    pub fn error(text: &str) -> Self {
        Self::new(MessageType::Error, text.as_bytes().to_vec())
    }

    pub fn is_page_end(&self) -> bool {
        self.kind == MessageType::Vector && self.payload.is_empty()
    }

    /// Payload as text, for `ERR_` messages.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Writes the envelope for a payload of `len` bytes.
pub fn encode_header(kind: MessageType, len: usize) -> WireResult<[u8; ENVELOPE_SIZE]> {
    if len > MAX_PAYLOAD_LEN {
        return Err(WireError::protocol(format!(
            "payload of {} bytes exceeds the {} byte limit",
            len, MAX_PAYLOAD_LEN
        )));
    }
    let mut header = [0u8; ENVELOPE_SIZE];
    header[0..4].copy_from_slice(kind.tag());
    header[4..12].copy_from_slice(format!("{:08X}", len).as_bytes());
    Ok(header)
}

/// Parses an envelope into its type and payload length.
///
/// # Errors
///
/// `KITE_WIRE_PROTOCOL` for an unknown tag, a length field with anything
/// other than hex digits, or a length above [`MAX_PAYLOAD_LEN`].
pub fn decode_header(header: &[u8; ENVELOPE_SIZE]) -> WireResult<(MessageType, usize)> {
    let kind = MessageType::from_tag(&header[0..4]).ok_or_else(|| {
        WireError::protocol(format!(
            "unknown message tag {:?}",
            String::from_utf8_lossy(&header[0..4])
        ))
    })?;

    let digits = &header[4..12];
    if !digits.iter().all(u8::is_ascii_hexdigit) {
        return Err(WireError::protocol(format!(
            "malformed length field {:?}",
            String::from_utf8_lossy(digits)
        )));
    }
    // eight hex digits always fit a u32
    let len = digits.iter().fold(0u32, |acc, d| {
        let nibble = (*d as char).to_digit(16).unwrap_or(0);
        (acc << 4) | nibble
    }) as usize;
    if len > MAX_PAYLOAD_LEN {
        return Err(WireError::protocol(format!(
            "declared length {} exceeds the {} byte limit",
            len, MAX_PAYLOAD_LEN
        )));
    }
    Ok((kind, len))
}

/// Envelope plus payload in one buffer.
pub fn encode_message(message: &Message) -> WireResult<Vec<u8>> {
    let header = encode_header(message.kind, message.payload.len())?;
    let mut out = Vec::with_capacity(ENVELOPE_SIZE + message.payload.len());
    out.extend_from_slice(&header);
    out.extend_from_slice(&message.payload);
    Ok(out)
}

/// Decodes one message from the start of `buf`, returning it and the bytes consumed.
pub fn decode_message(buf: &[u8]) -> WireResult<(Message, usize)> {
    if buf.len() < ENVELOPE_SIZE {
        return Err(WireError::protocol(format!(
            "need {} envelope bytes, have {}",
            ENVELOPE_SIZE,
            buf.len()
        )));
    }
    let mut header = [0u8; ENVELOPE_SIZE];
    header.copy_from_slice(&buf[..ENVELOPE_SIZE]);
    let (kind, len) = decode_header(&header)?;
    let end = ENVELOPE_SIZE + len;
    if buf.len() < end {
        return Err(WireError::protocol(format!(
            "payload truncated: declared {}, have {}",
            len,
            buf.len() - ENVELOPE_SIZE
        )));
    }
    Ok((Message::new(kind, buf[ENVELOPE_SIZE..end].to_vec()), end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_format() {
        let header = encode_header(MessageType::Json, 0x1A2B).unwrap();
        assert_eq!(&header, b"JSON00001A2B");
        let header = encode_header(MessageType::Handshake, 0).unwrap();
        assert_eq!(&header, b"KIT100000000");
    }

    #[test]
    fn test_decode_header() {
        assert_eq!(
            decode_header(b"VEC_000000FF").unwrap(),
            (MessageType::Vector, 255)
        );
        assert_eq!(
            decode_header(b"VEC_000000ff").unwrap(),
            (MessageType::Vector, 255)
        );
    }

    #[test]
    fn test_non_hex_length_rejected() {
        let err = decode_header(b"VEC_0000001G").unwrap_err();
        assert!(err.is_protocol());
        assert!(decode_header(b"VEC_ 0000001").is_err());
        assert!(decode_header(b"VEC_+0000001").is_err());
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let err = decode_header(b"NOPE00000000").unwrap_err();
        assert!(err.is_protocol());
    }

    #[test]
    fn test_length_above_limit_rejected() {
        assert!(decode_header(b"VEC_80000000").is_err());
        assert_eq!(
            decode_header(b"VEC_7FFFFFFF").unwrap().1,
            MAX_PAYLOAD_LEN
        );
    }

    #[test]
    fn test_message_round_trip() {
        let msg = Message::error("boom");
        let buf = encode_message(&msg).unwrap();
        assert_eq!(&buf[..12], b"ERR_00000004");
        let (decoded, used) = decode_message(&buf).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(used, 16);
        assert_eq!(decoded.text(), "boom");
    }

    #[test]
    fn test_page_end() {
        assert!(Message::page_end().is_page_end());
        assert!(!Message::vector(vec![1]).is_page_end());
        assert!(!Message::bye().is_page_end());
    }
}
