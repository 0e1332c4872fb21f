//! Framed message stream over any async byte stream
//!
//! `read_exact`/`write_all` loop over partial reads and writes, so a
//! message split across any number of socket reads decodes the same as
//! one delivered whole.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::errors::{WireError, WireResult};
use super::message::{decode_header, encode_header, Message, MessageType, ENVELOPE_SIZE};

/// Sends and receives framed messages.
#[derive(Debug)]
pub struct KiteStream<S> {
    inner: S,
    bytes_read: u64,
    bytes_written: u64,
}

impl<S> KiteStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            bytes_read: 0,
            bytes_written: 0,
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Envelope and payload bytes received so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl<S: AsyncWrite + Unpin> KiteStream<S> {
    /// Writes one message and flushes.
    pub async fn send(&mut self, kind: MessageType, payload: &[u8]) -> WireResult<()> {
        let header = encode_header(kind, payload.len())?;
        self.inner
            .write_all(&header)
            .await
            .map_err(|e| WireError::connection(format!("failed to send {} envelope", kind), e))?;
        if !payload.is_empty() {
            self.inner
                .write_all(payload)
                .await
                .map_err(|e| WireError::connection(format!("failed to send {} payload", kind), e))?;
        }
        self.inner
            .flush()
            .await
            .map_err(|e| WireError::connection("flush failed", e))?;
        self.bytes_written += (ENVELOPE_SIZE + payload.len()) as u64;
        Ok(())
    }

    pub async fn send_message(&mut self, message: &Message) -> WireResult<()> {
        self.send(message.kind, &message.payload).await
    }

    pub async fn shutdown(&mut self) -> WireResult<()> {
        self.inner
            .shutdown()
            .await
            .map_err(|e| WireError::connection("shutdown failed", e))
    }
}

impl<S: AsyncRead + Unpin> KiteStream<S> {
    /// Reads exactly one message.
    ///
    /// # Errors
    ///
    /// - `KITE_WIRE_CONNECTION` if the stream fails or ends mid-message
    /// - `KITE_WIRE_PROTOCOL` if the envelope is malformed
    pub async fn recv(&mut self) -> WireResult<Message> {
        let mut header = [0u8; ENVELOPE_SIZE];
        self.inner
            .read_exact(&mut header)
            .await
            .map_err(|e| WireError::connection("failed to read envelope", e))?;
        let (kind, len) = decode_header(&header)?;

        // sized by what arrives, not by the declared length
        let mut payload = Vec::new();
        if len > 0 {
            (&mut self.inner)
                .take(len as u64)
                .read_to_end(&mut payload)
                .await
                .map_err(|e| {
                    WireError::connection(
                        format!("failed to read {} byte {} payload", len, kind),
                        e,
                    )
                })?;
            if payload.len() != len {
                return Err(WireError::connection_msg(format!(
                    "stream ended after {} of {} {} payload bytes",
                    payload.len(),
                    len,
                    kind
                )));
            }
        }
        self.bytes_read += (ENVELOPE_SIZE + len) as u64;
        Ok(Message::new(kind, payload))
    }
}
