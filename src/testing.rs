//! Test doubles for streaming client development.
//!
//! In-memory implementations of the client and transport contracts, used
//! by this crate's tests and exported for downstream integration tests:
//!
//! - [`MockStreamingClient`]: records sends, scripted accept/reject
//! - [`InMemoryLeaseManager`]: records leases and checkpoints
//! - [`ScriptedProcessorHost`]: pumps pre-scripted batches per partition
//! - [`RecordingSender`]: records outbound events
//! - [`MockTransport`]: wires the above behind [`EventHubTransport`]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::{MessageCallback, StreamingClient};
use crate::error::ClientError;
use crate::eventhub::config::EventHubConfig;
use crate::eventhub::options::EphOptions;
use crate::eventhub::transport::{
    CloseReason, EventData, EventHubTransport, EventSender, Lease, LeaseManager,
    PartitionContext, PartitionProcessor, ProcessorHost,
};

/// Streaming client double that records every send.
pub struct MockStreamingClient {
    accept: bool,
    sent: Mutex<Vec<String>>,
    stops: AtomicUsize,
}

impl MockStreamingClient {
    /// Client whose sends always succeed.
    #[must_use]
    pub fn accepting() -> Self {
        Self {
            accept: true,
            sent: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
        }
    }

    /// Client whose sends always report failure (but still record).
    #[must_use]
    pub fn rejecting() -> Self {
        Self {
            accept: false,
            sent: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
        }
    }

    /// Messages passed to `send`, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Number of times `stop` was called.
    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MockStreamingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStreamingClient")
            .field("accept", &self.accept)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StreamingClient for MockStreamingClient {
    async fn send(&self, message: &str) -> bool {
        self.sent.lock().push(message.to_string());
        self.accept
    }

    async fn start_receiving(&self, _callback: MessageCallback) -> Result<(), ClientError> {
        Ok(())
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Lease manager that records acquisitions and checkpoints in memory.
pub struct InMemoryLeaseManager {
    epoch: AtomicU64,
    acquired: Mutex<Vec<String>>,
    checkpoints: Mutex<Vec<(String, String)>>,
    fail_checkpoints: AtomicBool,
}

impl InMemoryLeaseManager {
    /// Creates an empty lease manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: AtomicU64::new(0),
            acquired: Mutex::new(Vec::new()),
            checkpoints: Mutex::new(Vec::new()),
            fail_checkpoints: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent checkpoint call fail.
    pub fn fail_checkpoints(&self, fail: bool) {
        self.fail_checkpoints.store(fail, Ordering::SeqCst);
    }

    /// Partitions acquired so far, in order.
    #[must_use]
    pub fn acquired(&self) -> Vec<String> {
        self.acquired.lock().clone()
    }

    /// Recorded `(partition_id, offset)` checkpoints, in order.
    #[must_use]
    pub fn checkpoints(&self) -> Vec<(String, String)> {
        self.checkpoints.lock().clone()
    }
}

impl Default for InMemoryLeaseManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryLeaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLeaseManager").finish_non_exhaustive()
    }
}

#[async_trait]
impl LeaseManager for InMemoryLeaseManager {
    async fn acquire(&self, partition_id: &str) -> Result<Lease, ClientError> {
        self.acquired.lock().push(partition_id.to_string());
        Ok(Lease {
            partition_id: partition_id.to_string(),
            owner: "test-host".to_string(),
            epoch: self.epoch.fetch_add(1, Ordering::SeqCst) + 1,
        })
    }

    async fn checkpoint(
        &self,
        context: &PartitionContext,
        offset: &str,
    ) -> Result<(), ClientError> {
        if self.fail_checkpoints.load(Ordering::SeqCst) {
            return Err(ClientError::Checkpoint(format!(
                "injected checkpoint failure for partition {}",
                context.partition_id
            )));
        }
        self.checkpoints
            .lock()
            .push((context.partition_id.clone(), offset.to_string()));
        Ok(())
    }
}

type ScriptedBatches = Arc<Mutex<HashMap<String, Vec<Vec<EventData>>>>>;

/// Processor host that pumps pre-scripted batches to the processor.
///
/// `open` acquires a lease per scripted partition and spawns one pump
/// task each; the task delivers its batches and then parks until `close`
/// signals a reason. `close` waits for every pump to call the processor's
/// close hook before returning.
pub struct ScriptedProcessorHost {
    batches: ScriptedBatches,
    leases: Arc<dyn LeaseManager>,
    shutdown_tx: watch::Sender<Option<CloseReason>>,
    shutdown_rx: watch::Receiver<Option<CloseReason>>,
    tasks: Vec<JoinHandle<()>>,
    opened: bool,
}

impl ScriptedProcessorHost {
    /// Creates a host over the given script and lease manager.
    #[must_use]
    pub fn new(batches: ScriptedBatches, leases: Arc<dyn LeaseManager>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(None);
        Self {
            batches,
            leases,
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
            opened: false,
        }
    }

    async fn pump(
        partition_id: String,
        batches: Vec<Vec<EventData>>,
        processor: Arc<dyn PartitionProcessor>,
        mut shutdown: watch::Receiver<Option<CloseReason>>,
    ) {
        let mut context = PartitionContext::new(partition_id, "-1", -1);
        processor.open(&context).await;

        for batch in batches {
            if let Some(last) = batch.last() {
                if let Some(offset) = last.offset() {
                    context.offset = offset.to_string();
                }
                if let Some(sequence) = last.sequence_number() {
                    context.sequence_number = sequence;
                }
            }
            if let Err(error) = processor.process_batch(&context, batch).await {
                processor.process_error(&context, &error).await;
            }
        }

        let reason = match shutdown.wait_for(Option::is_some).await {
            Ok(reason) => reason.unwrap_or(CloseReason::Shutdown),
            // Host dropped without close; treat as failure.
            Err(_) => CloseReason::Failure,
        };
        processor.close(&context, reason).await;
    }
}

impl std::fmt::Debug for ScriptedProcessorHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedProcessorHost")
            .field("opened", &self.opened)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProcessorHost for ScriptedProcessorHost {
    async fn open(&mut self, processor: Arc<dyn PartitionProcessor>) -> Result<(), ClientError> {
        let script: Vec<(String, Vec<Vec<EventData>>)> =
            self.batches.lock().drain().collect();

        for (partition_id, batches) in script {
            self.leases.acquire(&partition_id).await?;
            self.tasks.push(tokio::spawn(Self::pump(
                partition_id,
                batches,
                Arc::clone(&processor),
                self.shutdown_rx.clone(),
            )));
        }
        self.opened = true;
        Ok(())
    }

    async fn close(&mut self, reason: CloseReason) -> Result<(), ClientError> {
        let _ = self.shutdown_tx.send(Some(reason));
        for task in self.tasks.drain(..) {
            task.await
                .map_err(|e| ClientError::Processing(format!("pump task panicked: {e}")))?;
        }
        Ok(())
    }
}

/// Event sender that records what it was asked to send.
pub struct RecordingSender {
    sent: Arc<Mutex<Vec<String>>>,
    fail_sends: Arc<AtomicBool>,
    connects: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl EventSender for RecordingSender {
    async fn connect(&mut self) -> Result<(), ClientError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&mut self, event: EventData) -> Result<(), ClientError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ClientError::Send("injected send failure".into()));
        }
        self.sent.lock().push(event.into_body());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl std::fmt::Debug for RecordingSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSender").finish_non_exhaustive()
    }
}

/// Transport double whose collaborators share state with the transport,
/// so tests can script batches and observe sends through it.
pub struct MockTransport {
    leases: Arc<InMemoryLeaseManager>,
    batches: ScriptedBatches,
    sent: Arc<Mutex<Vec<String>>>,
    fail_sends: Arc<AtomicBool>,
    sender_connects: Arc<AtomicUsize>,
    sender_closes: Arc<AtomicUsize>,
}

impl MockTransport {
    /// Creates a transport with no scripted batches.
    #[must_use]
    pub fn new() -> Self {
        Self {
            leases: Arc::new(InMemoryLeaseManager::new()),
            batches: Arc::new(Mutex::new(HashMap::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_sends: Arc::new(AtomicBool::new(false)),
            sender_connects: Arc::new(AtomicUsize::new(0)),
            sender_closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Scripts one batch of events for a partition. Batches are pumped
    /// in scripting order once a consumer opens its host.
    pub fn script_batch(&self, partition_id: &str, events: Vec<EventData>) {
        self.batches
            .lock()
            .entry(partition_id.to_string())
            .or_default()
            .push(events);
    }

    /// The shared lease manager handed to every consumer.
    #[must_use]
    pub fn lease_manager_handle(&self) -> Arc<InMemoryLeaseManager> {
        Arc::clone(&self.leases)
    }

    /// Makes every subsequent outbound send fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Message bodies sent through any sender, in order.
    #[must_use]
    pub fn sent_messages(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Number of sender connections established.
    #[must_use]
    pub fn sender_connect_count(&self) -> usize {
        self.sender_connects.load(Ordering::SeqCst)
    }

    /// Number of times a sender was closed.
    #[must_use]
    pub fn sender_close_count(&self) -> usize {
        self.sender_closes.load(Ordering::SeqCst)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport").finish_non_exhaustive()
    }
}

impl EventHubTransport for MockTransport {
    fn lease_manager(
        &self,
        _config: &EventHubConfig,
    ) -> Result<Arc<dyn LeaseManager>, ClientError> {
        Ok(Arc::clone(&self.leases) as Arc<dyn LeaseManager>)
    }

    fn processor_host(
        &self,
        _config: &EventHubConfig,
        _options: &EphOptions,
        leases: Arc<dyn LeaseManager>,
    ) -> Result<Box<dyn ProcessorHost>, ClientError> {
        Ok(Box::new(ScriptedProcessorHost::new(
            Arc::clone(&self.batches),
            leases,
        )))
    }

    fn sender(&self, _config: &EventHubConfig) -> Result<Box<dyn EventSender>, ClientError> {
        Ok(Box::new(RecordingSender {
            sent: Arc::clone(&self.sent),
            fail_sends: Arc::clone(&self.fail_sends),
            connects: Arc::clone(&self.sender_connects),
            closes: Arc::clone(&self.sender_closes),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_client_records_sends() {
        let client = MockStreamingClient::rejecting();
        assert!(!client.send("a").await);
        client.stop().await;
        assert_eq!(client.sent(), vec!["a"]);
        assert_eq!(client.stop_count(), 1);
    }

    #[tokio::test]
    async fn test_lease_manager_records() {
        let leases = InMemoryLeaseManager::new();
        let lease = leases.acquire("0").await.unwrap();
        assert_eq!(lease.epoch, 1);
        assert_eq!(leases.acquired(), vec!["0"]);

        let context = PartitionContext::new("0", "5", 1);
        leases.checkpoint(&context, "5").await.unwrap();
        assert_eq!(leases.checkpoints(), vec![("0".into(), "5".into())]);
    }

    #[tokio::test]
    async fn test_recording_sender_round_trip() {
        let transport = MockTransport::new();
        let mut sender = transport.sender(&dummy_config()).unwrap();
        sender.connect().await.unwrap();
        sender.send(EventData::new("m")).await.unwrap();
        sender.close().await.unwrap();
        assert_eq!(transport.sent_messages(), vec!["m"]);
        assert_eq!(transport.sender_connect_count(), 1);
        assert_eq!(transport.sender_close_count(), 1);
    }

    fn dummy_config() -> EventHubConfig {
        use crate::config::{keys, ClientConfig};
        let mut config = ClientConfig::new("eventhub");
        config.set(keys::EVENT_HUB_NAMESPACE, "ns");
        config.set(keys::EVENT_HUB_NAME, "hub");
        EventHubConfig::from_config(&config).unwrap()
    }
}
