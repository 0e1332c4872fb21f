//! Shared helpers for integration tests: scripted fragment servers and
//! vector builders.

#![allow(dead_code)]

use kite::wire::{KiteStream, Message, MessageType};
use kite::xrg::{LogicalType, PhysicalType, Value, Vector, VectorBuilder};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

// =============================================================================
// Vector Builders
// =============================================================================

/// Int32 column; `None` items carry the NULL flag.
pub fn int32_vector(items: &[Option<i32>]) -> Vector {
    let mut builder = VectorBuilder::new(PhysicalType::Int32, LogicalType::None);
    for item in items {
        let value = item.map(Value::Int32).unwrap_or(Value::Null);
        builder.push(&value).unwrap();
    }
    builder.finish().unwrap()
}

pub fn string_vector(items: &[&str]) -> Vector {
    let mut builder = VectorBuilder::new(PhysicalType::ByteArray, LogicalType::String);
    for item in items {
        builder.push(&Value::String((*item).to_string())).unwrap();
    }
    builder.finish().unwrap()
}

/// Int32 value of column 0 of every row.
pub fn first_column_ints(rows: &[kite::xrg::Row]) -> Vec<i32> {
    rows.iter()
        .map(|row| match row.get(0) {
            Some(Value::Int32(v)) => *v,
            other => panic!("expected int32, got {:?}", other),
        })
        .collect()
}

// =============================================================================
// Scripted Fragment Server
// =============================================================================

/// One step of a fragment server's reply
#[derive(Debug, Clone)]
pub enum Reply {
    /// Vectors then an empty `VEC_`
    Page(Vec<Vector>),
    /// Vectors with no page terminator
    Vectors(Vec<Vector>),
    Bye,
    Error(String),
    /// Send nothing more and keep the socket open until the client hangs up
    Stall,
}

/// Binds a listener, accepts one connection, reads the handshake and the
/// JSON request, then plays `replies`. The handle yields the request.
pub async fn spawn_fragment_server(replies: Vec<Reply>) -> (String, JoinHandle<serde_json::Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut conn = KiteStream::new(socket);

        let hello = conn.recv().await.unwrap();
        assert_eq!(hello.kind, MessageType::Handshake);
        let request = conn.recv().await.unwrap();
        assert_eq!(request.kind, MessageType::Json);
        let json: serde_json::Value = serde_json::from_slice(&request.payload).unwrap();

        // the client may hang up early; write failures are not test failures
        for reply in replies {
            let sent = match reply {
                Reply::Page(vectors) => send_vectors(&mut conn, &vectors, true).await,
                Reply::Vectors(vectors) => send_vectors(&mut conn, &vectors, false).await,
                Reply::Bye => conn.send_message(&Message::bye()).await.is_ok(),
                Reply::Error(text) => conn.send_message(&Message::error(&text)).await.is_ok(),
                Reply::Stall => {
                    let _ = conn.recv().await;
                    false
                }
            };
            if !sent {
                break;
            }
        }
        json
    });
    (addr, handle)
}

async fn send_vectors(
    conn: &mut KiteStream<tokio::net::TcpStream>,
    vectors: &[Vector],
    terminate: bool,
) -> bool {
    for vector in vectors {
        if conn.send(MessageType::Vector, &vector.encode(false)).await.is_err() {
            return false;
        }
    }
    if terminate {
        return conn.send_message(&Message::page_end()).await.is_ok();
    }
    true
}
