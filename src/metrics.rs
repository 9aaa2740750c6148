//! Client metrics types.
//!
//! Lightweight atomic counters maintained by the concrete clients,
//! exposed as point-in-time snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracked by a streaming client instance.
#[derive(Debug, Default)]
pub struct ClientMetrics {
    /// Messages accepted by the backend on the send path.
    pub messages_sent: AtomicU64,

    /// Messages delivered to the receive callback.
    pub messages_received: AtomicU64,

    /// Batches processed on the receive path.
    pub batches_total: AtomicU64,

    /// Successful checkpoint commits.
    pub checkpoints_total: AtomicU64,

    /// Errors encountered (send or receive path).
    pub errors_total: AtomicU64,
}

impl ClientMetrics {
    /// Creates a new metrics instance with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an accepted send.
    pub fn record_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a message delivered to the callback.
    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a processed batch.
    pub fn record_batch(&self) {
        self.batches_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a checkpoint commit.
    pub fn record_checkpoint(&self) {
        self.checkpoints_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an error.
    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of the current counters.
    #[must_use]
    pub fn snapshot(&self) -> ClientMetricsSnapshot {
        ClientMetricsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            batches_total: self.batches_total.load(Ordering::Relaxed),
            checkpoints_total: self.checkpoints_total.load(Ordering::Relaxed),
            errors_total: self.errors_total.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of client metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientMetricsSnapshot {
    /// Messages accepted by the backend.
    pub messages_sent: u64,

    /// Messages delivered to the callback.
    pub messages_received: u64,

    /// Batches processed.
    pub batches_total: u64,

    /// Checkpoint commits.
    pub checkpoints_total: u64,

    /// Errors encountered.
    pub errors_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = ClientMetrics::new();
        metrics.record_sent();
        metrics.record_received();
        metrics.record_received();
        metrics.record_batch();
        metrics.record_checkpoint();
        metrics.record_error();

        let snap = metrics.snapshot();
        assert_eq!(snap.messages_sent, 1);
        assert_eq!(snap.messages_received, 2);
        assert_eq!(snap.batches_total, 1);
        assert_eq!(snap.checkpoints_total, 1);
        assert_eq!(snap.errors_total, 1);
    }

    #[test]
    fn test_snapshot_default() {
        let snap = ClientMetrics::new().snapshot();
        assert_eq!(snap, ClientMetricsSnapshot::default());
    }
}
