//! Wire Framing Tests
//!
//! Tests for the message envelope:
//! - Payloads of any size survive a send/recv round trip
//! - Partial reads never change what is decoded
//! - Malformed envelopes are protocol errors, short streams are connection errors

use kite::wire::{
    decode_header, decode_message, encode_message, KiteStream, Message, MessageType,
    ENVELOPE_SIZE,
};
use tokio_test::io::Builder;

// =============================================================================
// Round Trips
// =============================================================================

async fn round_trip(kind: MessageType, payload: Vec<u8>) -> Message {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let expected = payload.clone();
    let writer = tokio::spawn(async move {
        let mut client = KiteStream::new(client);
        client.send(kind, &expected).await.unwrap();
        client
    });
    let mut server = KiteStream::new(server);
    let msg = server.recv().await.unwrap();
    let client = writer.await.unwrap();
    assert_eq!(client.bytes_written(), (ENVELOPE_SIZE + payload.len()) as u64);
    assert_eq!(server.bytes_read(), client.bytes_written());
    msg
}

#[tokio::test]
async fn test_empty_payload_round_trip() {
    let msg = round_trip(MessageType::Vector, Vec::new()).await;
    assert!(msg.is_page_end());
}

#[tokio::test]
async fn test_one_byte_payload_round_trip() {
    let msg = round_trip(MessageType::Json, b"x".to_vec()).await;
    assert_eq!(msg.kind, MessageType::Json);
    assert_eq!(msg.payload, b"x");
}

#[tokio::test]
async fn test_ten_megabyte_payload_round_trip() {
    let payload: Vec<u8> = (0..10_000_000u32).map(|i| (i % 251) as u8).collect();
    let msg = round_trip(MessageType::Vector, payload.clone()).await;
    assert_eq!(msg.payload.len(), 10_000_000);
    assert!(msg.payload == payload);
}

#[test]
fn test_envelope_is_uppercase_hex() {
    let encoded = encode_message(&Message::json(vec![0u8; 0xAB])).unwrap();
    assert_eq!(&encoded[..ENVELOPE_SIZE], b"JSON000000AB");
}

// =============================================================================
// Partial Reads
// =============================================================================

#[tokio::test]
async fn test_one_byte_reads_decode_whole_message() {
    let encoded = encode_message(&Message::json(br#"{"sql":"select 1"}"#.to_vec())).unwrap();
    let mut builder = Builder::new();
    for byte in &encoded {
        builder.read(std::slice::from_ref(byte));
    }
    let mut stream = KiteStream::new(builder.build());
    let msg = stream.recv().await.unwrap();
    assert_eq!(msg.kind, MessageType::Json);
    assert_eq!(msg.payload, br#"{"sql":"select 1"}"#);
}

#[tokio::test]
async fn test_back_to_back_messages_in_one_read() {
    let mut bytes = encode_message(&Message::vector(vec![1, 2, 3])).unwrap();
    bytes.extend(encode_message(&Message::page_end()).unwrap());
    bytes.extend(encode_message(&Message::bye()).unwrap());

    let mut stream = KiteStream::new(Builder::new().read(&bytes).build());
    assert_eq!(stream.recv().await.unwrap().payload, vec![1, 2, 3]);
    assert!(stream.recv().await.unwrap().is_page_end());
    assert_eq!(stream.recv().await.unwrap().kind, MessageType::Bye);
}

#[tokio::test]
async fn test_lowercase_hex_accepted() {
    let mut stream = KiteStream::new(Builder::new().read(b"ERR_0000000aabcdefghij").build());
    let msg = stream.recv().await.unwrap();
    assert_eq!(msg.kind, MessageType::Error);
    assert_eq!(msg.text(), "abcdefghij");
}

// =============================================================================
// Malformed Input
// =============================================================================

#[test]
fn test_non_hex_length_rejected() {
    let err = decode_header(b"JSON0000000G").unwrap_err();
    assert!(err.is_protocol());
}

#[test]
fn test_unknown_tag_rejected() {
    let err = decode_header(b"ABCD00000000").unwrap_err();
    assert!(err.is_protocol());
    assert!(err.message().contains("ABCD"));
}

#[test]
fn test_truncated_buffer_rejected() {
    let encoded = encode_message(&Message::json(b"0123456789".to_vec())).unwrap();
    assert!(decode_message(&encoded[..ENVELOPE_SIZE + 4]).is_err());
    assert!(decode_message(&encoded[..5]).is_err());
    let (msg, used) = decode_message(&encoded).unwrap();
    assert_eq!(used, encoded.len());
    assert_eq!(msg.payload, b"0123456789");
}

#[tokio::test]
async fn test_stream_ending_mid_payload_is_connection_error() {
    let mut stream = KiteStream::new(Builder::new().read(b"VEC_00000010abcd").build());
    let err = stream.recv().await.unwrap_err();
    assert!(err.is_connection());
}

#[tokio::test]
async fn test_stream_ending_mid_envelope_is_connection_error() {
    let mut stream = KiteStream::new(Builder::new().read(b"VEC_0").build());
    let err = stream.recv().await.unwrap_err();
    assert!(err.is_connection());
}

#[tokio::test]
async fn test_bad_envelope_on_stream_is_protocol_error() {
    let mut stream = KiteStream::new(Builder::new().read(b"JSONxyz00000").build());
    let err = stream.recv().await.unwrap_err();
    assert!(err.is_protocol());
}
