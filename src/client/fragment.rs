//! Fragment connections and their page streams
//!
//! Each fragment connection becomes a stream of [`FragmentEvent`]s: one
//! `Page` per run of vectors closed by an empty `VEC_`, then `Complete`
//! on `BYE_` or `Failed` on `ERR_` or a socket/format error. The stream
//! ends after its terminal event.

use std::time::Duration;

use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use super::errors::{ClientError, ClientResult};
use crate::wire::{KiteStream, MessageType, WireError};
use crate::xrg::Vector;

/// Index of a fragment in the client's fragment table.
///
/// Handles are never reused within one query, so an event for a closed
/// fragment cannot be mistaken for a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentHandle(usize);

impl FragmentHandle {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Lifecycle of one fragment connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentState {
    Open,
    /// `BYE_` received
    Complete,
    Failed,
    /// Torn down by the client before completing
    Closed,
}

/// Book-keeping for one fragment
#[derive(Debug, Clone)]
pub struct FragmentSlot {
    pub handle: FragmentHandle,
    pub host: String,
    /// `[index, total]` as sent in the request
    pub fragment: [u32; 2],
    pub state: FragmentState,
    pub pages: u64,
}

/// What a fragment stream produced
#[derive(Debug)]
pub enum FragmentEvent {
    /// Vectors of one page and the wire bytes they took
    Page { vectors: Vec<Vector>, bytes: u64 },
    Complete,
    Failed(ClientError),
}

/// Result of reading one page off a connection
#[derive(Debug)]
pub enum PageOutcome {
    /// Closed by an empty `VEC_`
    Page(Vec<Vector>),
    /// Vectors followed directly by `BYE_`
    Final(Vec<Vector>),
    /// `BYE_` with no pending vectors
    Bye,
}

/// Reads messages until a page terminator or a terminal message.
///
/// # Errors
///
/// - `ClientError::Server` with the text of an `ERR_` message
/// - `ClientError::Wire` on socket failure or an unexpected message type
/// - `ClientError::Format` if a vector does not decode
pub async fn receive_page<S>(stream: &mut KiteStream<S>) -> ClientResult<PageOutcome>
where
    S: AsyncRead + Unpin,
{
    let mut page = Vec::new();
    loop {
        let msg = stream.recv().await?;
        match msg.kind {
            MessageType::Vector if msg.payload.is_empty() => return Ok(PageOutcome::Page(page)),
            MessageType::Vector => page.push(Vector::decode(&msg.payload)?),
            MessageType::Bye if page.is_empty() => return Ok(PageOutcome::Bye),
            MessageType::Bye => return Ok(PageOutcome::Final(page)),
            MessageType::Error => return Err(ClientError::Server(msg.text())),
            other => {
                return Err(WireError::protocol(format!(
                    "unexpected {} message from server",
                    other
                ))
                .into())
            }
        }
    }
}

pub(crate) type PageStream = BoxStream<'static, (FragmentHandle, FragmentEvent)>;

enum ReadState<S> {
    Reading(KiteStream<S>),
    /// Final page delivered, `Complete` still owed
    Finishing,
    Done,
}

/// Turns a connection into its event stream. Nothing is read until polled.
pub(crate) fn page_stream<S>(handle: FragmentHandle, stream: KiteStream<S>) -> PageStream
where
    S: AsyncRead + Unpin + Send + 'static,
{
    stream::unfold(ReadState::Reading(stream), move |state| async move {
        match state {
            ReadState::Reading(mut conn) => {
                let before = conn.bytes_read();
                let (event, next) = match receive_page(&mut conn).await {
                    Ok(PageOutcome::Page(vectors)) => {
                        let bytes = conn.bytes_read() - before;
                        (FragmentEvent::Page { vectors, bytes }, ReadState::Reading(conn))
                    }
                    Ok(PageOutcome::Final(vectors)) => {
                        let bytes = conn.bytes_read() - before;
                        (FragmentEvent::Page { vectors, bytes }, ReadState::Finishing)
                    }
                    Ok(PageOutcome::Bye) => (FragmentEvent::Complete, ReadState::Done),
                    Err(e) => (FragmentEvent::Failed(e), ReadState::Done),
                };
                Some(((handle, event), next))
            }
            ReadState::Finishing => Some(((handle, FragmentEvent::Complete), ReadState::Done)),
            ReadState::Done => None,
        }
    })
    .boxed()
}

/// Sends the handshake and the JSON request.
pub async fn send_request<S>(stream: &mut KiteStream<S>, request: &[u8]) -> ClientResult<()>
where
    S: AsyncWrite + Unpin,
{
    stream.send(MessageType::Handshake, &[]).await?;
    stream.send(MessageType::Json, request).await?;
    Ok(())
}

/// Dials `host` and sends the request.
pub async fn open_fragment(
    host: &str,
    timeout: Duration,
    request: &[u8],
) -> ClientResult<KiteStream<TcpStream>> {
    let socket = tokio::time::timeout(timeout, TcpStream::connect(host))
        .await
        .map_err(|_| {
            WireError::connection_msg(format!(
                "connect to {} timed out after {}ms",
                host,
                timeout.as_millis()
            ))
        })?
        .map_err(|e| WireError::connection(format!("failed to connect to {}", host), e))?;
    socket
        .set_nodelay(true)
        .map_err(|e| WireError::connection(format!("failed to configure socket to {}", host), e))?;

    let mut stream = KiteStream::new(socket);
    send_request(&mut stream, request).await?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Message;
    use crate::xrg::{LogicalType, PhysicalType, Value, VectorBuilder};

    fn vector_bytes(values: &[i32]) -> Vec<u8> {
        let mut builder = VectorBuilder::new(PhysicalType::Int32, LogicalType::None);
        for v in values {
            builder.push(&Value::Int32(*v)).unwrap();
        }
        builder.finish().unwrap().encode(false)
    }

    async fn serve(messages: Vec<Message>) -> KiteStream<tokio::io::DuplexStream> {
        let (client, server) = tokio::io::duplex(1 << 16);
        let mut server = KiteStream::new(server);
        for msg in &messages {
            server.send_message(msg).await.unwrap();
        }
        // keep the server half alive until the client drops
        tokio::spawn(async move {
            let _server = server;
            std::future::pending::<()>().await;
        });
        KiteStream::new(client)
    }

    #[tokio::test]
    async fn test_page_then_bye() {
        let mut stream = serve(vec![
            Message::vector(vector_bytes(&[1, 2])),
            Message::page_end(),
            Message::bye(),
        ])
        .await;

        match receive_page(&mut stream).await.unwrap() {
            PageOutcome::Page(vectors) => assert_eq!(vectors.len(), 1),
            other => panic!("expected page, got {:?}", other),
        }
        assert!(matches!(
            receive_page(&mut stream).await.unwrap(),
            PageOutcome::Bye
        ));
    }

    #[tokio::test]
    async fn test_error_message_text() {
        let mut stream = serve(vec![Message::error("boom")]).await;
        let err = receive_page(&mut stream).await.unwrap_err();
        assert_eq!(err.server_message(), Some("boom"));
    }

    #[tokio::test]
    async fn test_unexpected_message_type() {
        let mut stream = serve(vec![Message::json(b"{}".to_vec())]).await;
        let err = receive_page(&mut stream).await.unwrap_err();
        assert_eq!(err.kind(), crate::client::ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn test_stream_delivers_final_page_before_complete() {
        let stream = serve(vec![Message::vector(vector_bytes(&[7])), Message::bye()]).await;
        let events: Vec<_> = page_stream(FragmentHandle::new(3), stream).collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, FragmentHandle::new(3));
        assert!(matches!(&events[0].1, FragmentEvent::Page { vectors, .. } if vectors.len() == 1));
        assert!(matches!(events[1].1, FragmentEvent::Complete));
    }

    #[tokio::test]
    async fn test_corrupt_vector_fails_stream() {
        let stream = serve(vec![Message::vector(b"XRG0garbage".to_vec())]).await;
        let events: Vec<_> = page_stream(FragmentHandle::new(0), stream).collect().await;
        assert_eq!(events.len(), 1);
        match &events[0].1 {
            FragmentEvent::Failed(e) => assert_eq!(e.kind(), crate::client::ErrorKind::Format),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_request_frames() {
        let (client, server) = tokio::io::duplex(1024);
        let mut client = KiteStream::new(client);
        let mut server = KiteStream::new(server);
        send_request(&mut client, b"{\"sql\":\"x\"}").await.unwrap();
        assert_eq!(server.recv().await.unwrap(), Message::handshake());
        assert_eq!(server.recv().await.unwrap().kind, MessageType::Json);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        let err = open_fragment(&addr, Duration::from_secs(2), b"{}")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::client::ErrorKind::Connection);
    }
}
