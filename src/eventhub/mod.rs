//! Partitioned, checkpointed event hub streaming client.
//!
//! [`EventHubStreamingClient`] operates in one of two modes, fixed at
//! construction by the presence of storage credentials:
//!
//! - **Consumer**: runs a per-partition processor under a lease manager
//!   with batch-level checkpointing. `start_receiving` blocks until a
//!   configured timeout elapses, `stop` is invoked, or the process
//!   receives a termination signal.
//! - **Producer**: holds one persistent sender connection. `send` returns
//!   `false` on any transport error; errors are logged, never propagated.

pub mod config;
pub mod options;
pub mod processor;
pub mod transport;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::client::{ClientState, MessageCallback, StreamingClient};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::metrics::{ClientMetrics, ClientMetricsSnapshot};
use crate::signal;

use self::config::{ClientMode, EventHubConfig};
use self::options::EphOptions;
use self::processor::EventProcessor;
use self::transport::{
    CloseReason, EventData, EventHubTransport, EventSender, LeaseManager, ProcessorHost,
};

/// Streaming client backed by a partitioned event hub.
pub struct EventHubStreamingClient {
    mode: Mode,
    metrics: Arc<ClientMetrics>,
}

enum Mode {
    Consumer(ConsumerClient),
    Producer(ProducerClient),
}

struct ConsumerClient {
    config: EventHubConfig,
    options: EphOptions,
    leases: Arc<dyn LeaseManager>,
    host: tokio::sync::Mutex<Box<dyn ProcessorHost>>,
    state: RwLock<ClientState>,
    /// Taken by the first stop request; `None` afterwards, making
    /// double-stop a no-op.
    shutdown: Arc<parking_lot::Mutex<Option<oneshot::Sender<()>>>>,
}

struct ProducerClient {
    sender: tokio::sync::Mutex<Box<dyn EventSender>>,
    /// Only mutated while holding the sender lock.
    connected: AtomicBool,
    closed: AtomicBool,
}

impl EventHubStreamingClient {
    /// Builds a client from a configuration record, selecting the mode
    /// from the storage credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] for missing or partial
    /// configuration, or [`ClientError`] if the transport cannot build
    /// the mode's collaborators.
    pub fn from_config(
        config: &ClientConfig,
        transport: &dyn EventHubTransport,
    ) -> Result<Self, ClientError> {
        let eh_config = EventHubConfig::from_config(config)?;
        let metrics = Arc::new(ClientMetrics::new());

        let mode = match eh_config.mode {
            ClientMode::Consumer => {
                let eph_options = EphOptions::from_client_config(config);
                let leases = transport.lease_manager(&eh_config)?;
                let host = transport.processor_host(&eh_config, &eph_options, Arc::clone(&leases))?;
                info!(
                    namespace = %eh_config.namespace,
                    eventhub = %eh_config.eventhub,
                    consumer_group = %eh_config.consumer_group,
                    timeout = ?eh_config.timeout,
                    "created event hub consumer"
                );
                Mode::Consumer(ConsumerClient {
                    config: eh_config,
                    options: eph_options,
                    leases,
                    host: tokio::sync::Mutex::new(host),
                    state: RwLock::new(ClientState::Created),
                    shutdown: Arc::new(parking_lot::Mutex::new(None)),
                })
            }
            ClientMode::Producer => {
                let sender = transport.sender(&eh_config)?;
                info!(address = %eh_config.amqp_address(), "created event hub producer");
                Mode::Producer(ProducerClient {
                    sender: tokio::sync::Mutex::new(sender),
                    connected: AtomicBool::new(false),
                    closed: AtomicBool::new(false),
                })
            }
        };

        Ok(Self { mode, metrics })
    }

    /// Returns the operating mode fixed at construction.
    #[must_use]
    pub fn mode(&self) -> ClientMode {
        match self.mode {
            Mode::Consumer(_) => ClientMode::Consumer,
            Mode::Producer(_) => ClientMode::Producer,
        }
    }

    /// Returns the lifecycle state. Producers report `Created` until
    /// stopped.
    #[must_use]
    pub fn state(&self) -> ClientState {
        match &self.mode {
            Mode::Consumer(consumer) => *consumer.state.read(),
            Mode::Producer(producer) => {
                if producer.closed.load(Ordering::Acquire) {
                    ClientState::Stopped
                } else {
                    ClientState::Created
                }
            }
        }
    }

    /// Returns the resolved processor host options (consumer mode only).
    #[must_use]
    pub fn eph_options(&self) -> Option<&EphOptions> {
        match &self.mode {
            Mode::Consumer(consumer) => Some(&consumer.options),
            Mode::Producer(_) => None,
        }
    }

    /// Returns a snapshot of the client's counters.
    #[must_use]
    pub fn metrics(&self) -> ClientMetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl std::fmt::Debug for EventHubStreamingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHubStreamingClient")
            .field("mode", &self.mode())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StreamingClient for EventHubStreamingClient {
    async fn send(&self, message: &str) -> bool {
        match &self.mode {
            Mode::Producer(producer) => producer.send(message, &self.metrics).await,
            Mode::Consumer(_) => {
                warn!("send is undefined for a consumer-mode client");
                false
            }
        }
    }

    async fn start_receiving(&self, callback: MessageCallback) -> Result<(), ClientError> {
        match &self.mode {
            Mode::Consumer(consumer) => consumer.run(callback, &self.metrics).await,
            Mode::Producer(_) => Err(ClientError::NotSupported(
                "producer-mode clients cannot receive".into(),
            )),
        }
    }

    async fn stop(&self) {
        match &self.mode {
            Mode::Consumer(consumer) => consumer.request_stop(),
            Mode::Producer(producer) => producer.close().await,
        }
    }
}

impl ConsumerClient {
    /// Runs the receive loop: open the host, block until timeout, stop,
    /// or termination signal, then close the host exactly once.
    async fn run(
        &self,
        callback: MessageCallback,
        metrics: &Arc<ClientMetrics>,
    ) -> Result<(), ClientError> {
        {
            let mut state = self.state.write();
            if *state != ClientState::Created {
                return Err(ClientError::Configuration(format!(
                    "cannot start receiving in state {state}"
                )));
            }
            *state = ClientState::Receiving;
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        *self.shutdown.lock() = Some(shutdown_tx);

        // A termination signal takes the same path as an explicit stop.
        let shutdown_slot = Arc::clone(&self.shutdown);
        let _signal_hook = signal::register_stop_hook(move || {
            if let Some(tx) = shutdown_slot.lock().take() {
                let _ = tx.send(());
            }
        });

        let processor = Arc::new(EventProcessor::new(
            callback,
            Arc::clone(&self.leases),
            Arc::clone(metrics),
        ));

        {
            let mut host = self.host.lock().await;
            if let Err(error) = host.open(processor).await {
                self.shutdown.lock().take();
                *self.state.write() = ClientState::Stopped;
                return Err(error);
            }
        }
        info!(
            eventhub = %self.config.eventhub,
            max_batch_size = self.options.max_batch_size,
            "receiving from event hub"
        );

        wait_for_shutdown(shutdown_rx, self.config.timeout).await;

        *self.state.write() = ClientState::Stopping;
        {
            let mut host = self.host.lock().await;
            if let Err(error) = host.close(CloseReason::Shutdown).await {
                warn!(%error, "processor host did not close cleanly");
            }
        }

        // A stop that never fired leaves its sender behind; drop it so a
        // later stop() is a no-op.
        self.shutdown.lock().take();
        *self.state.write() = ClientState::Stopped;
        info!("event hub consumer stopped");
        Ok(())
    }

    /// Signals the blocking wait to complete. Idempotent; safe from any
    /// task, including the termination-signal path.
    fn request_stop(&self) {
        if let Some(tx) = self.shutdown.lock().take() {
            info!("stopping event hub consumer");
            let _ = tx.send(());
        } else {
            debug!("stop requested but consumer is not receiving");
        }
    }
}

/// Blocks until the configured timeout elapses or a stop is signalled.
async fn wait_for_shutdown(
    shutdown_rx: oneshot::Receiver<()>,
    timeout: Option<std::time::Duration>,
) {
    match timeout {
        Some(timeout) => {
            tokio::select! {
                () = tokio::time::sleep(timeout) => {
                    info!(?timeout, "receive timeout elapsed, closing");
                }
                _ = shutdown_rx => {
                    info!("stop requested, closing");
                }
            }
        }
        None => {
            // No timeout: wait indefinitely for an external stop.
            let _ = shutdown_rx.await;
            info!("stop requested, closing");
        }
    }
}

impl ProducerClient {
    async fn send(&self, message: &str, metrics: &ClientMetrics) -> bool {
        if self.closed.load(Ordering::Acquire) {
            warn!("send on a stopped producer");
            return false;
        }

        let mut sender = self.sender.lock().await;
        if !self.connected.load(Ordering::Acquire) {
            if let Err(error) = sender.connect().await {
                error!(%error, "failed to connect event hub sender");
                metrics.record_error();
                return false;
            }
            self.connected.store(true, Ordering::Release);
        }

        match sender.send(EventData::new(message)).await {
            Ok(()) => {
                debug!(bytes = message.len(), "message sent");
                metrics.record_sent();
                true
            }
            Err(error) => {
                error!(%error, "failed to send message to event hub");
                metrics.record_error();
                false
            }
        }
    }

    async fn close(&self) {
        let mut sender = self.sender.lock().await;
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.connected.load(Ordering::Acquire) {
            if let Err(error) = sender.close().await {
                error!(%error, "failed to close event hub sender");
            }
        }
        info!("event hub producer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::keys;
    use crate::testing::MockTransport;

    fn producer_config() -> ClientConfig {
        let mut config = ClientConfig::new("eventhub");
        config.set(keys::EVENT_HUB_NAMESPACE, "ns");
        config.set(keys::EVENT_HUB_NAME, "hub");
        config.set(keys::EVENT_HUB_SAS_POLICY, "policy");
        config.set(keys::EVENT_HUB_SAS_KEY, "key");
        config
    }

    fn consumer_config() -> ClientConfig {
        let mut config = producer_config();
        config.set(keys::AZURE_STORAGE_ACCOUNT, "account");
        config.set(keys::AZURE_STORAGE_ACCESS_KEY, "secret");
        config.set(keys::LEASE_CONTAINER_NAME, "leases");
        config
    }

    #[tokio::test]
    async fn test_mode_selection() {
        let transport = MockTransport::new();
        let producer =
            EventHubStreamingClient::from_config(&producer_config(), &transport).unwrap();
        assert_eq!(producer.mode(), ClientMode::Producer);

        let consumer =
            EventHubStreamingClient::from_config(&consumer_config(), &transport).unwrap();
        assert_eq!(consumer.mode(), ClientMode::Consumer);
        assert_eq!(consumer.state(), ClientState::Created);
    }

    #[tokio::test]
    async fn test_partial_credentials_rejected() {
        let transport = MockTransport::new();
        let mut config = producer_config();
        config.set(keys::AZURE_STORAGE_ACCOUNT, "account");

        let err = EventHubStreamingClient::from_config(&config, &transport).unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_producer_send_and_stop() {
        let transport = MockTransport::new();
        let client =
            EventHubStreamingClient::from_config(&producer_config(), &transport).unwrap();

        assert!(client.send("hello").await);
        assert!(client.send("world").await);
        assert_eq!(transport.sent_messages(), vec!["hello", "world"]);
        assert_eq!(client.metrics().messages_sent, 2);

        client.stop().await;
        assert_eq!(client.state(), ClientState::Stopped);
        // Sends after stop are rejected without touching the transport.
        assert!(!client.send("late").await);
        assert_eq!(transport.sent_messages().len(), 2);
    }

    #[tokio::test]
    async fn test_producer_send_failure_returns_false() {
        let transport = MockTransport::new();
        transport.fail_sends(true);
        let client =
            EventHubStreamingClient::from_config(&producer_config(), &transport).unwrap();

        assert!(!client.send("doomed").await);
        assert_eq!(client.metrics().errors_total, 1);
    }

    #[tokio::test]
    async fn test_producer_double_stop_is_noop() {
        let transport = MockTransport::new();
        let client =
            EventHubStreamingClient::from_config(&producer_config(), &transport).unwrap();
        client.send("x").await;
        client.stop().await;
        client.stop().await;
        assert_eq!(transport.sender_close_count(), 1);
    }

    #[tokio::test]
    async fn test_producer_cannot_receive() {
        let transport = MockTransport::new();
        let client =
            EventHubStreamingClient::from_config(&producer_config(), &transport).unwrap();
        let callback: MessageCallback = Arc::new(|_| {});
        let result = client.start_receiving(callback).await;
        assert!(matches!(result, Err(ClientError::NotSupported(_))));
    }

    #[tokio::test]
    async fn test_consumer_send_is_rejected() {
        let transport = MockTransport::new();
        let client =
            EventHubStreamingClient::from_config(&consumer_config(), &transport).unwrap();
        assert!(!client.send("nope").await);
    }

    #[tokio::test]
    async fn test_consumer_timeout_returns_without_stop() {
        let transport = MockTransport::new();
        let mut config = consumer_config();
        config.set(keys::TIMEOUT, "0");
        let client = EventHubStreamingClient::from_config(&config, &transport).unwrap();

        let callback: MessageCallback = Arc::new(|_| {});
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            client.start_receiving(callback),
        )
        .await;
        assert!(result.is_ok(), "start_receiving did not honor TIMEOUT=0");
        assert!(result.unwrap().is_ok());
        assert_eq!(client.state(), ClientState::Stopped);
    }

    #[tokio::test]
    async fn test_eph_options_exposed_for_consumer() {
        let transport = MockTransport::new();
        let mut config = consumer_config();
        config.set(keys::EVENT_HUB_EPH_OPTIONS, r#"{"max_batch_size": 4}"#);
        let client = EventHubStreamingClient::from_config(&config, &transport).unwrap();
        assert_eq!(client.eph_options().unwrap().max_batch_size, 4);

        let producer =
            EventHubStreamingClient::from_config(&producer_config(), &transport).unwrap();
        assert!(producer.eph_options().is_none());
    }
}
