//! Client construction from configuration.
//!
//! [`ClientFactory`] resolves a configuration record into a concrete
//! [`StreamingClient`]. The set of client kinds is the closed
//! [`ClientKind`] enum; unknown kind strings are a configuration error
//! rather than a lookup miss.

use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::broadcast::BroadcastStreamingClient;
use crate::client::StreamingClient;
use crate::config::{ClientConfig, ClientSpec};
use crate::error::ClientError;
use crate::eventhub::transport::EventHubTransport;
use crate::eventhub::EventHubStreamingClient;

/// Known streaming client kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    /// Fan-out client over a set of downstream clients.
    Broadcast,

    /// Partitioned event hub consumer or producer.
    EventHub,
}

impl ClientKind {
    /// Canonical configuration string for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientKind::Broadcast => "broadcast",
            ClientKind::EventHub => "eventhub",
        }
    }
}

impl FromStr for ClientKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "broadcast" => Ok(ClientKind::Broadcast),
            "eventhub" => Ok(ClientKind::EventHub),
            other => Err(ClientError::Configuration(format!(
                "unknown client kind '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for ClientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds streaming clients from configuration records.
pub struct ClientFactory {
    transport: Arc<dyn EventHubTransport>,
}

impl ClientFactory {
    /// Creates a factory that builds event hub clients over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn EventHubTransport>) -> Self {
        Self { transport }
    }

    /// Resolves a client spec: pre-built instances are adopted as-is,
    /// configuration records are constructed.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] for unknown kinds and
    /// propagates construction errors from the concrete client.
    pub fn create(&self, spec: &ClientSpec) -> Result<Arc<dyn StreamingClient>, ClientError> {
        match spec {
            ClientSpec::Instance(client) => Ok(Arc::clone(client)),
            ClientSpec::Config(config) => self.create_from_config(config),
        }
    }

    /// Builds a client of the kind named by `config.kind()`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] for unknown kinds and
    /// propagates construction errors from the concrete client.
    pub fn create_from_config(
        &self,
        config: &ClientConfig,
    ) -> Result<Arc<dyn StreamingClient>, ClientError> {
        let kind = ClientKind::from_str(config.kind())?;
        debug!(%kind, "creating streaming client");
        match kind {
            ClientKind::Broadcast => Ok(Arc::new(BroadcastStreamingClient::from_config(
                self, config,
            )?)),
            ClientKind::EventHub => Ok(Arc::new(EventHubStreamingClient::from_config(
                config,
                self.transport.as_ref(),
            )?)),
        }
    }
}

impl std::fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientFactory").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::keys;
    use crate::testing::{MockStreamingClient, MockTransport};

    fn eventhub_config() -> ClientConfig {
        let mut config = ClientConfig::new("eventhub");
        config.set(keys::EVENT_HUB_NAMESPACE, "ns");
        config.set(keys::EVENT_HUB_NAME, "hub");
        config
    }

    #[test]
    fn test_kind_round_trip() {
        assert_eq!("broadcast".parse::<ClientKind>().unwrap(), ClientKind::Broadcast);
        assert_eq!("eventhub".parse::<ClientKind>().unwrap(), ClientKind::EventHub);
        assert_eq!(ClientKind::Broadcast.as_str(), "broadcast");
    }

    #[test]
    fn test_unknown_kind_is_configuration_error() {
        let factory = ClientFactory::new(Arc::new(MockTransport::new()));
        let config = ClientConfig::new("carrier-pigeon");
        let err = factory.create_from_config(&config).unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_creates_eventhub_client() {
        let factory = ClientFactory::new(Arc::new(MockTransport::new()));
        let client = factory.create_from_config(&eventhub_config()).unwrap();
        assert!(client.send("hello").await);
    }

    #[tokio::test]
    async fn test_creates_broadcast_of_configs_and_instances() {
        let factory = ClientFactory::new(Arc::new(MockTransport::new()));
        let instance = Arc::new(MockStreamingClient::accepting());

        let mut config = ClientConfig::new("broadcast");
        config.push_client(ClientSpec::Config(eventhub_config()));
        config.push_client(ClientSpec::Instance(instance.clone()));

        let client = factory.create_from_config(&config).unwrap();
        assert!(client.send("x").await);
        assert_eq!(instance.sent(), vec!["x"]);
    }

    #[test]
    fn test_broadcast_propagates_downstream_error() {
        let factory = ClientFactory::new(Arc::new(MockTransport::new()));
        let mut bad = eventhub_config();
        bad.set(keys::AZURE_STORAGE_ACCOUNT, "account-without-key");

        let mut config = ClientConfig::new("broadcast");
        config.push_client(ClientSpec::Config(bad));

        let err = factory.create_from_config(&config).unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[test]
    fn test_adopts_instance_spec() {
        let factory = ClientFactory::new(Arc::new(MockTransport::new()));
        let instance: Arc<dyn StreamingClient> = Arc::new(MockStreamingClient::accepting());
        let resolved = factory.create(&ClientSpec::Instance(instance.clone())).unwrap();
        assert!(Arc::ptr_eq(&instance, &resolved));
    }
}
