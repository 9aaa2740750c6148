//! Fan-out streaming client.
//!
//! [`BroadcastStreamingClient`] forwards every outbound message to a fixed
//! set of downstream clients. The set is immutable after construction;
//! membership changes mean building a new broadcaster.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::client::{MessageCallback, StreamingClient};
use crate::config::{ClientConfig, ClientSpec};
use crate::error::ClientError;
use crate::factory::ClientFactory;

/// Streaming client that replicates each send across downstream clients.
pub struct BroadcastStreamingClient {
    clients: Vec<Arc<dyn StreamingClient>>,
}

impl BroadcastStreamingClient {
    /// Creates a broadcaster over the given downstream clients.
    ///
    /// An empty set is allowed; every send then trivially succeeds.
    #[must_use]
    pub fn new(clients: Vec<Arc<dyn StreamingClient>>) -> Self {
        info!(clients = clients.len(), "created broadcast client");
        Self { clients }
    }

    /// Builds a broadcaster from a configuration record, resolving each
    /// downstream entry through `factory`.
    ///
    /// Entries may be configuration records or pre-built client instances;
    /// instances are adopted as-is.
    ///
    /// # Errors
    ///
    /// Returns the first error produced while resolving a downstream
    /// entry; no partially constructed broadcaster is returned.
    pub fn from_config(factory: &ClientFactory, config: &ClientConfig) -> Result<Self, ClientError> {
        let mut clients = Vec::with_capacity(config.clients().len());
        for spec in config.clients() {
            let client = match spec {
                ClientSpec::Instance(client) => Arc::clone(client),
                ClientSpec::Config(sub_config) => factory.create_from_config(sub_config)?,
            };
            clients.push(client);
        }
        Ok(Self::new(clients))
    }

    /// Number of downstream clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

impl std::fmt::Debug for BroadcastStreamingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastStreamingClient")
            .field("clients", &self.clients.len())
            .finish()
    }
}

#[async_trait]
impl StreamingClient for BroadcastStreamingClient {
    /// Sends `message` to every downstream client, even after a failure,
    /// and reports whether all of them accepted it.
    async fn send(&self, message: &str) -> bool {
        let mut all_accepted = true;
        for (index, client) in self.clients.iter().enumerate() {
            if !client.send(message).await {
                warn!(client = index, "downstream client rejected message");
                all_accepted = false;
            }
        }
        debug!(
            clients = self.clients.len(),
            accepted = all_accepted,
            "message broadcast"
        );
        all_accepted
    }

    async fn start_receiving(&self, _callback: MessageCallback) -> Result<(), ClientError> {
        Err(ClientError::NotSupported(
            "broadcast clients are send-only".into(),
        ))
    }

    /// Stops every downstream client, continuing past individual failures.
    async fn stop(&self) {
        for client in &self.clients {
            client.stop().await;
        }
        info!(clients = self.clients.len(), "broadcast client stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockStreamingClient;

    #[tokio::test]
    async fn test_send_reaches_every_client() {
        let a = Arc::new(MockStreamingClient::accepting());
        let b = Arc::new(MockStreamingClient::accepting());
        let broadcast = BroadcastStreamingClient::new(vec![a.clone(), b.clone()]);

        assert!(broadcast.send("x").await);
        assert_eq!(a.sent(), vec!["x"]);
        assert_eq!(b.sent(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_short_circuit() {
        let a = Arc::new(MockStreamingClient::rejecting());
        let b = Arc::new(MockStreamingClient::accepting());
        let broadcast = BroadcastStreamingClient::new(vec![a.clone(), b.clone()]);

        assert!(!broadcast.send("x").await);
        // The rejecting client still saw the message, and so did the one
        // after it.
        assert_eq!(a.sent(), vec!["x"]);
        assert_eq!(b.sent(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_empty_broadcaster_accepts() {
        let broadcast = BroadcastStreamingClient::new(Vec::new());
        assert!(broadcast.send("x").await);
        assert_eq!(broadcast.client_count(), 0);
    }

    #[tokio::test]
    async fn test_receiving_not_supported() {
        let broadcast = BroadcastStreamingClient::new(Vec::new());
        let callback: MessageCallback = Arc::new(|_| {});
        let result = broadcast.start_receiving(callback).await;
        assert!(matches!(result, Err(ClientError::NotSupported(_))));
    }

    #[tokio::test]
    async fn test_stop_reaches_every_client() {
        let a = Arc::new(MockStreamingClient::accepting());
        let b = Arc::new(MockStreamingClient::accepting());
        let broadcast = BroadcastStreamingClient::new(vec![a.clone(), b.clone()]);

        broadcast.stop().await;
        assert_eq!(a.stop_count(), 1);
        assert_eq!(b.stop_count(), 1);
    }
}
