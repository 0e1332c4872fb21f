//! Readiness fan-in over all fragment connections
//!
//! Every registered connection contributes one page stream to a
//! `SelectAll`. All streams are polled on the caller's task; the only
//! suspension point is [`Multiplexer::wait`]. Once it returns, events
//! that are already available can be drained with
//! [`Multiplexer::poll_ready`] without blocking.

use futures_util::stream::{SelectAll, StreamExt};
use futures_util::FutureExt;
use tokio::io::AsyncRead;

use super::fragment::{
    page_stream, FragmentEvent, FragmentHandle, FragmentSlot, FragmentState, PageStream,
};
use crate::wire::KiteStream;

/// Fragment table plus the streams of the fragments still open.
#[derive(Default)]
pub struct Multiplexer {
    streams: SelectAll<PageStream>,
    slots: Vec<FragmentSlot>,
}

impl Multiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection whose request has already been sent.
    pub fn register<S>(
        &mut self,
        host: impl Into<String>,
        fragment: [u32; 2],
        stream: KiteStream<S>,
    ) -> FragmentHandle
    where
        S: AsyncRead + Unpin + Send + 'static,
    {
        let handle = FragmentHandle::new(self.slots.len());
        self.slots.push(FragmentSlot {
            handle,
            host: host.into(),
            fragment,
            state: FragmentState::Open,
            pages: 0,
        });
        self.streams.push(page_stream(handle, stream));
        handle
    }

    /// Waits for the next event from any open fragment.
    ///
    /// Returns `None` once no fragment is open.
    pub async fn wait(&mut self) -> Option<(FragmentHandle, FragmentEvent)> {
        loop {
            let (handle, event) = self.streams.next().await?;
            if self.accept(handle, &event) {
                return Some((handle, event));
            }
        }
    }

    /// Returns an event only if one is available without blocking.
    pub fn poll_ready(&mut self) -> Option<(FragmentHandle, FragmentEvent)> {
        loop {
            let (handle, event) = self.streams.next().now_or_never().flatten()?;
            if self.accept(handle, &event) {
                return Some((handle, event));
            }
        }
    }

    /// Updates the slot for `handle`. Events for slots no longer open are dropped.
    fn accept(&mut self, handle: FragmentHandle, event: &FragmentEvent) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index()) else {
            return false;
        };
        if slot.state != FragmentState::Open {
            return false;
        }
        match event {
            FragmentEvent::Page { vectors, .. } if vectors.is_empty() => {}
            FragmentEvent::Page { .. } => slot.pages += 1,
            FragmentEvent::Complete => slot.state = FragmentState::Complete,
            FragmentEvent::Failed(_) => slot.state = FragmentState::Failed,
        }
        true
    }

    /// Drops every open connection. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.streams = SelectAll::new();
        for slot in &mut self.slots {
            if slot.state == FragmentState::Open {
                slot.state = FragmentState::Closed;
            }
        }
    }

    /// Forgets all fragments, for the next query.
    pub fn reset(&mut self) {
        self.close();
        self.slots.clear();
    }

    /// True when no fragment stream is left to poll.
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn open_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state == FragmentState::Open)
            .count()
    }

    pub fn slots(&self) -> &[FragmentSlot] {
        &self.slots
    }

    pub fn slot(&self, handle: FragmentHandle) -> Option<&FragmentSlot> {
        self.slots.get(handle.index())
    }
}

impl std::fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multiplexer")
            .field("streams", &self.streams.len())
            .field("slots", &self.slots)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Message;
    use crate::xrg::{LogicalType, PhysicalType, Value, VectorBuilder};
    use tokio::io::DuplexStream;

    fn vector_bytes(values: &[i64]) -> Vec<u8> {
        let mut builder = VectorBuilder::new(PhysicalType::Int64, LogicalType::None);
        for v in values {
            builder.push(&Value::Int64(*v)).unwrap();
        }
        builder.finish().unwrap().encode(false)
    }

    fn pair() -> (KiteStream<DuplexStream>, KiteStream<DuplexStream>) {
        let (a, b) = tokio::io::duplex(1 << 16);
        (KiteStream::new(a), KiteStream::new(b))
    }

    #[tokio::test]
    async fn test_empty_multiplexer_returns_none() {
        let mut mux = Multiplexer::new();
        assert!(mux.is_empty());
        assert!(mux.wait().await.is_none());
        assert!(mux.poll_ready().is_none());
    }

    #[tokio::test]
    async fn test_events_from_two_fragments() {
        let mut mux = Multiplexer::new();
        let (c0, mut s0) = pair();
        let (c1, mut s1) = pair();
        let h0 = mux.register("a", [0, 2], c0);
        let h1 = mux.register("b", [1, 2], c1);

        for server in [&mut s0, &mut s1] {
            server.send_message(&Message::vector(vector_bytes(&[1, 2]))).await.unwrap();
            server.send_message(&Message::page_end()).await.unwrap();
            server.send_message(&Message::bye()).await.unwrap();
        }

        let mut pages = 0;
        let mut completed = Vec::new();
        while let Some((handle, event)) = mux.wait().await {
            match event {
                FragmentEvent::Page { vectors, bytes } => {
                    assert_eq!(vectors.len(), 1);
                    assert!(bytes > 0);
                    pages += 1;
                }
                FragmentEvent::Complete => completed.push(handle),
                FragmentEvent::Failed(e) => panic!("unexpected failure: {}", e),
            }
        }
        completed.sort();
        assert_eq!(pages, 2);
        assert_eq!(completed, vec![h0, h1]);
        assert!(mux.is_empty());
        assert_eq!(mux.open_count(), 0);
        assert_eq!(mux.slot(h0).unwrap().pages, 1);
    }

    #[tokio::test]
    async fn test_poll_ready_does_not_block() {
        let mut mux = Multiplexer::new();
        let (c0, _s0) = pair();
        mux.register("a", [0, 1], c0);
        // server has sent nothing
        assert!(mux.poll_ready().is_none());
        assert!(!mux.is_empty());
    }

    #[tokio::test]
    async fn test_stalled_fragment_does_not_block_others() {
        let mut mux = Multiplexer::new();
        let (c0, mut s0) = pair();
        let (c1, mut s1) = pair();
        let h0 = mux.register("a", [0, 2], c0);
        let h1 = mux.register("b", [1, 2], c1);

        // fragment 0 stops mid-page with its stream still open
        s0.send_message(&Message::vector(vector_bytes(&[1]))).await.unwrap();
        s1.send_message(&Message::vector(vector_bytes(&[2]))).await.unwrap();
        s1.send_message(&Message::page_end()).await.unwrap();
        s1.send_message(&Message::bye()).await.unwrap();

        let waited = tokio::time::timeout(std::time::Duration::from_secs(2), mux.wait())
            .await
            .expect("wait blocked on the stalled fragment");
        let (handle, event) = waited.unwrap();
        assert_eq!(handle, h1);
        assert!(matches!(event, FragmentEvent::Page { .. }));
        assert!(matches!(mux.poll_ready(), Some((h, FragmentEvent::Complete)) if h == h1));
        assert!(mux.poll_ready().is_none());
        assert_eq!(mux.slot(h0).unwrap().state, FragmentState::Open);
        assert_eq!(mux.open_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_page_not_counted() {
        let mut mux = Multiplexer::new();
        let (c0, mut s0) = pair();
        let h0 = mux.register("a", [0, 1], c0);
        s0.send_message(&Message::page_end()).await.unwrap();
        s0.send_message(&Message::bye()).await.unwrap();

        while mux.wait().await.is_some() {}
        assert_eq!(mux.slot(h0).unwrap().pages, 0);
        assert_eq!(mux.slot(h0).unwrap().state, FragmentState::Complete);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut mux = Multiplexer::new();
        let (c0, _s0) = pair();
        let h0 = mux.register("a", [0, 1], c0);
        mux.close();
        mux.close();
        assert!(mux.is_empty());
        assert_eq!(mux.slot(h0).unwrap().state, FragmentState::Closed);
        assert!(mux.wait().await.is_none());
    }

    #[tokio::test]
    async fn test_failure_marks_slot() {
        let mut mux = Multiplexer::new();
        let (c0, mut s0) = pair();
        let h0 = mux.register("a", [0, 1], c0);
        s0.send_message(&Message::error("boom")).await.unwrap();

        let (handle, event) = mux.wait().await.unwrap();
        assert_eq!(handle, h0);
        assert!(matches!(event, FragmentEvent::Failed(_)));
        assert_eq!(mux.slot(h0).unwrap().state, FragmentState::Failed);
        assert!(mux.wait().await.is_none());
    }
}
