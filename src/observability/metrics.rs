//! Client counters
//!
//! - Counters only, monotonic
//! - Shared through an `Arc`; relaxed atomics, no locks

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one client
#[derive(Debug, Default)]
pub struct ClientMetrics {
    queries_submitted: AtomicU64,
    queries_rejected: AtomicU64,
    fragments_opened: AtomicU64,
    fragments_completed: AtomicU64,
    fragments_failed: AtomicU64,
    pages_received: AtomicU64,
    vectors_decoded: AtomicU64,
    /// Envelope and payload bytes read from fragment sockets
    bytes_received: AtomicU64,
    rows_returned: AtomicU64,
    invalid_rows_skipped: AtomicU64,
}

impl ClientMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_queries_submitted(&self) {
        self.queries_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_fragments_opened(&self) {
        self.fragments_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_fragments_completed(&self) {
        self.fragments_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_fragments_failed(&self) {
        self.fragments_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_pages(&self) {
        self.pages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_vectors(&self, count: u64) {
        self.vectors_decoded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_bytes_received(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_rows(&self) {
        self.rows_returned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_invalid_rows(&self, count: u64) {
        self.invalid_rows_skipped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn rows_returned(&self) -> u64 {
        self.rows_returned.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_submitted: self.queries_submitted.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            fragments_opened: self.fragments_opened.load(Ordering::Relaxed),
            fragments_completed: self.fragments_completed.load(Ordering::Relaxed),
            fragments_failed: self.fragments_failed.load(Ordering::Relaxed),
            pages_received: self.pages_received.load(Ordering::Relaxed),
            vectors_decoded: self.vectors_decoded.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            rows_returned: self.rows_returned.load(Ordering::Relaxed),
            invalid_rows_skipped: self.invalid_rows_skipped.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_submitted: u64,
    pub queries_rejected: u64,
    pub fragments_opened: u64,
    pub fragments_completed: u64,
    pub fragments_failed: u64,
    pub pages_received: u64,
    pub vectors_decoded: u64,
    pub bytes_received: u64,
    pub rows_returned: u64,
    pub invalid_rows_skipped: u64,
}

impl MetricsSnapshot {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
