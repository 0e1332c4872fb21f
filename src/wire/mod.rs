//! Length-framed message protocol
//!
//! A 4-byte ASCII tag, an 8-digit hex payload length and the payload.
//! Reads and writes always complete whole messages or fail.

mod errors;
mod message;
mod stream;

pub use errors::{WireError, WireErrorCode, WireResult};
pub use message::{
    decode_header, decode_message, encode_header, encode_message, Message, MessageType,
    ENVELOPE_SIZE, MAX_PAYLOAD_LEN,
};
pub use stream::KiteStream;
