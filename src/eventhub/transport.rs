//! Collaborator interfaces of the partitioned event hub client.
//!
//! The lease/checkpoint backend, the processor host, and the wire
//! transport are external collaborators. This module defines the narrow
//! contracts through which the client consumes them:
//!
//! - [`LeaseManager`]: partition ownership and checkpoint offsets
//! - [`ProcessorHost`]: pumps per-partition event batches to a processor
//! - [`EventSender`]: one persistent outbound connection
//! - [`EventHubTransport`]: provider that constructs the above from config
//!
//! Calls into these collaborators are blocking I/O that may fail
//! transiently; callers log the failure and abandon the affected
//! partition's cycle rather than retrying here.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::config::EventHubConfig;
use super::options::EphOptions;
use crate::error::ClientError;

/// One event on the wire. Payloads are opaque strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventData {
    body: String,
    offset: Option<String>,
    sequence_number: Option<i64>,
}

impl EventData {
    /// Creates an outbound event with no stream position.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            offset: None,
            sequence_number: None,
        }
    }

    /// Creates an inbound event at a known stream position.
    #[must_use]
    pub fn with_position(
        body: impl Into<String>,
        offset: impl Into<String>,
        sequence_number: i64,
    ) -> Self {
        Self {
            body: body.into(),
            offset: Some(offset.into()),
            sequence_number: Some(sequence_number),
        }
    }

    /// Returns the event body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Consumes the event, returning its body.
    #[must_use]
    pub fn into_body(self) -> String {
        self.body
    }

    /// Returns the offset within the partition, if known.
    #[must_use]
    pub fn offset(&self) -> Option<&str> {
        self.offset.as_deref()
    }

    /// Returns the sequence number within the partition, if known.
    #[must_use]
    pub fn sequence_number(&self) -> Option<i64> {
        self.sequence_number
    }
}

/// Read-only information about a partition, used to checkpoint and log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionContext {
    /// Partition identifier.
    pub partition_id: String,

    /// Offset of the most recently delivered event.
    pub offset: String,

    /// Sequence number of the most recently delivered event.
    pub sequence_number: i64,
}

impl PartitionContext {
    /// Creates a new partition context.
    #[must_use]
    pub fn new(partition_id: impl Into<String>, offset: impl Into<String>, sequence_number: i64) -> Self {
        Self {
            partition_id: partition_id.into(),
            offset: offset.into(),
            sequence_number,
        }
    }
}

impl fmt::Display for PartitionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.partition_id, self.offset)
    }
}

/// Why a partition processor or host is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Orderly shutdown requested by the owning client.
    Shutdown,

    /// The partition lease was lost to another consumer instance.
    LeaseLost,

    /// An unrecoverable failure in the host.
    Failure,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Shutdown => write!(f, "Shutdown"),
            CloseReason::LeaseLost => write!(f, "LeaseLost"),
            CloseReason::Failure => write!(f, "Failure"),
        }
    }
}

/// A time-bounded ownership claim over one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    /// The owned partition.
    pub partition_id: String,

    /// Identity of the owning consumer instance.
    pub owner: String,

    /// Monotonic lease epoch; increments on each change of ownership.
    pub epoch: u64,
}

/// Partition ownership and checkpoint storage.
#[async_trait]
pub trait LeaseManager: Send + Sync {
    /// Acquires a lease on the given partition.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the lease is held elsewhere or the
    /// storage backend fails.
    async fn acquire(&self, partition_id: &str) -> Result<Lease, ClientError>;

    /// Durably records `offset` as the last processed position of the
    /// partition described by `context`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Checkpoint`] on storage failure.
    async fn checkpoint(&self, context: &PartitionContext, offset: &str) -> Result<(), ClientError>;
}

/// Per-partition event handler driven by a [`ProcessorHost`].
///
/// One processor instance is shared across all partitions owned by the
/// host; the context identifies the partition for each call.
#[async_trait]
pub trait PartitionProcessor: Send + Sync {
    /// Called once when the host begins pumping a partition.
    async fn open(&self, context: &PartitionContext);

    /// Handles one batch of events from a partition.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on processing or checkpoint failure; the
    /// host reports it via [`process_error`](Self::process_error) and
    /// keeps pumping.
    async fn process_batch(
        &self,
        context: &PartitionContext,
        events: Vec<EventData>,
    ) -> Result<(), ClientError>;

    /// Called when the host observed an error on this partition. Sibling
    /// partitions are unaffected.
    async fn process_error(&self, context: &PartitionContext, error: &ClientError);

    /// Called once when the host stops pumping a partition.
    async fn close(&self, context: &PartitionContext, reason: CloseReason);
}

/// Pumps batches of events per owned partition to a registered processor
/// and manages lease renewal.
#[async_trait]
pub trait ProcessorHost: Send {
    /// Acquires leases for owned partitions and starts pumping batches
    /// to `processor`. Returns once pumping has started.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if leases cannot be acquired or the
    /// receive transport cannot be opened.
    async fn open(&mut self, processor: Arc<dyn PartitionProcessor>) -> Result<(), ClientError>;

    /// Cancels all per-partition pump tasks, waits for each to observe
    /// the cancellation, and releases resources. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if teardown fails.
    async fn close(&mut self, reason: CloseReason) -> Result<(), ClientError>;
}

/// One persistent outbound connection to the event stream service.
#[async_trait]
pub trait EventSender: Send {
    /// Establishes the connection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] on connection failure.
    async fn connect(&mut self) -> Result<(), ClientError>;

    /// Sends one event, returning once the backend acknowledges it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Send`] if the backend rejects or fails the send.
    async fn send(&mut self, event: EventData) -> Result<(), ClientError>;

    /// Closes the connection. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the close fails.
    async fn close(&mut self) -> Result<(), ClientError>;
}

/// Provider of concrete collaborator instances for a configuration.
///
/// Injected into the client factory so the core stays independent of the
/// wire transport and storage backend implementations.
pub trait EventHubTransport: Send + Sync {
    /// Builds the lease/checkpoint manager for this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the configuration cannot
    /// name a storage backend.
    fn lease_manager(&self, config: &EventHubConfig) -> Result<Arc<dyn LeaseManager>, ClientError>;

    /// Builds the processor host for this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the host cannot be constructed.
    fn processor_host(
        &self,
        config: &EventHubConfig,
        options: &EphOptions,
        leases: Arc<dyn LeaseManager>,
    ) -> Result<Box<dyn ProcessorHost>, ClientError>;

    /// Builds the outbound sender for this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the sender cannot be constructed.
    fn sender(&self, config: &EventHubConfig) -> Result<Box<dyn EventSender>, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_data_outbound() {
        let event = EventData::new("payload");
        assert_eq!(event.body(), "payload");
        assert_eq!(event.offset(), None);
        assert_eq!(event.sequence_number(), None);
    }

    #[test]
    fn test_event_data_inbound() {
        let event = EventData::with_position("payload", "1234", 7);
        assert_eq!(event.offset(), Some("1234"));
        assert_eq!(event.sequence_number(), Some(7));
        assert_eq!(event.into_body(), "payload");
    }

    #[test]
    fn test_partition_context_display() {
        let ctx = PartitionContext::new("3", "42", 9);
        assert_eq!(ctx.to_string(), "3@42");
    }

    #[test]
    fn test_close_reason_display() {
        assert_eq!(CloseReason::Shutdown.to_string(), "Shutdown");
        assert_eq!(CloseReason::LeaseLost.to_string(), "LeaseLost");
        assert_eq!(CloseReason::Failure.to_string(), "Failure");
    }
}
