//! Per-partition event processor.
//!
//! [`EventProcessor`] is the handler the processor host drives for every
//! owned partition: it decodes each event body, invokes the caller's
//! message callback synchronously in delivery order, and checkpoints the
//! partition once per batch at the batch's high-water offset.
//!
//! Checkpointing once per batch means a crash between messages of the
//! same batch can redeliver the whole batch downstream (at-least-once).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use super::transport::{
    CloseReason, EventData, LeaseManager, PartitionContext, PartitionProcessor,
};
use crate::client::MessageCallback;
use crate::error::ClientError;
use crate::metrics::ClientMetrics;

/// Partition processor that bridges host-delivered batches to the
/// caller-supplied message callback.
pub struct EventProcessor {
    callback: MessageCallback,
    leases: Arc<dyn LeaseManager>,
    metrics: Arc<ClientMetrics>,
}

impl EventProcessor {
    /// Creates a processor bound to the given callback and lease manager.
    #[must_use]
    pub fn new(
        callback: MessageCallback,
        leases: Arc<dyn LeaseManager>,
        metrics: Arc<ClientMetrics>,
    ) -> Self {
        Self {
            callback,
            leases,
            metrics,
        }
    }
}

impl std::fmt::Debug for EventProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventProcessor").finish_non_exhaustive()
    }
}

#[async_trait]
impl PartitionProcessor for EventProcessor {
    async fn open(&self, context: &PartitionContext) {
        info!(partition = %context.partition_id, "partition processor opened");
    }

    async fn process_batch(
        &self,
        context: &PartitionContext,
        events: Vec<EventData>,
    ) -> Result<(), ClientError> {
        let mut high_water: Option<String> = None;
        let batch_len = events.len();

        for event in events {
            if let Some(offset) = event.offset() {
                high_water = Some(offset.to_string());
            }
            let body = event.into_body();
            (self.callback)(body);
            self.metrics.record_received();
        }

        self.metrics.record_batch();
        debug!(
            partition = %context.partition_id,
            events = batch_len,
            sequence = context.sequence_number,
            "batch processed"
        );

        // One checkpoint per batch, at its high-water offset.
        if let Some(offset) = high_water {
            self.leases
                .checkpoint(context, &offset)
                .await
                .map_err(|e| {
                    self.metrics.record_error();
                    ClientError::Checkpoint(format!(
                        "partition {}: {e}",
                        context.partition_id
                    ))
                })?;
            self.metrics.record_checkpoint();
        }

        Ok(())
    }

    async fn process_error(&self, context: &PartitionContext, error: &ClientError) {
        // The host keeps pumping this partition; nothing to do beyond
        // recording the failure.
        self.metrics.record_error();
        error!(partition = %context.partition_id, %error, "partition processing error");
    }

    async fn close(&self, context: &PartitionContext, reason: CloseReason) {
        info!(
            partition = %context.partition_id,
            %reason,
            offset = %context.offset,
            sequence = context.sequence_number,
            "partition processor closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryLeaseManager;
    use parking_lot::Mutex;

    fn collector() -> (MessageCallback, Arc<Mutex<Vec<String>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let callback: MessageCallback = Arc::new(move |message| sink.lock().push(message));
        (callback, received)
    }

    #[tokio::test]
    async fn test_callback_order_then_single_checkpoint() {
        let leases = Arc::new(InMemoryLeaseManager::new());
        let metrics = Arc::new(ClientMetrics::new());
        let (callback, received) = collector();
        let processor = EventProcessor::new(callback, leases.clone(), metrics.clone());

        let context = PartitionContext::new("0", "12", 3);
        let events = vec![
            EventData::with_position("a", "10", 1),
            EventData::with_position("b", "11", 2),
            EventData::with_position("c", "12", 3),
        ];

        processor.process_batch(&context, events).await.unwrap();

        assert_eq!(*received.lock(), vec!["a", "b", "c"]);
        assert_eq!(leases.checkpoints(), vec![("0".to_string(), "12".to_string())]);

        let snap = metrics.snapshot();
        assert_eq!(snap.messages_received, 3);
        assert_eq!(snap.batches_total, 1);
        assert_eq!(snap.checkpoints_total, 1);
    }

    #[tokio::test]
    async fn test_empty_batch_does_not_checkpoint() {
        let leases = Arc::new(InMemoryLeaseManager::new());
        let metrics = Arc::new(ClientMetrics::new());
        let (callback, _received) = collector();
        let processor = EventProcessor::new(callback, leases.clone(), metrics);

        let context = PartitionContext::new("0", "", -1);
        processor.process_batch(&context, Vec::new()).await.unwrap();
        assert!(leases.checkpoints().is_empty());
    }

    #[tokio::test]
    async fn test_checkpoint_failure_surfaces_after_callbacks() {
        let leases = Arc::new(InMemoryLeaseManager::new());
        leases.fail_checkpoints(true);
        let metrics = Arc::new(ClientMetrics::new());
        let (callback, received) = collector();
        let processor = EventProcessor::new(callback, leases, metrics.clone());

        let context = PartitionContext::new("1", "5", 1);
        let result = processor
            .process_batch(&context, vec![EventData::with_position("x", "5", 1)])
            .await;

        // The callback ran before the checkpoint failed.
        assert_eq!(*received.lock(), vec!["x"]);
        assert!(matches!(result, Err(ClientError::Checkpoint(_))));
        assert_eq!(metrics.snapshot().errors_total, 1);
    }

    #[tokio::test]
    async fn test_process_error_counts() {
        let leases = Arc::new(InMemoryLeaseManager::new());
        let metrics = Arc::new(ClientMetrics::new());
        let (callback, _received) = collector();
        let processor = EventProcessor::new(callback, leases, metrics.clone());

        let context = PartitionContext::new("2", "", -1);
        processor
            .process_error(&context, &ClientError::Processing("boom".into()))
            .await;
        assert_eq!(metrics.snapshot().errors_total, 1);
    }
}
