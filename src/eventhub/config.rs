//! Event hub client configuration.
//!
//! [`EventHubConfig`] is parsed once from a [`ClientConfig`] at client
//! construction. The presence of storage-account credentials selects the
//! client mode permanently: both present selects consumer mode, both
//! absent selects producer mode, and partial credentials fail fast.

use std::fmt;
use std::time::Duration;

use crate::config::{keys, ClientConfig};
use crate::error::ClientError;

/// Default consumer group when none is configured.
pub const DEFAULT_CONSUMER_GROUP: &str = "$Default";

/// Operating mode of an event hub client, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMode {
    /// Partitioned consumer under a lease manager with checkpointing.
    Consumer,

    /// Single persistent outbound sender.
    Producer,
}

impl fmt::Display for ClientMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientMode::Consumer => write!(f, "Consumer"),
            ClientMode::Producer => write!(f, "Producer"),
        }
    }
}

/// Parsed configuration for an event hub client.
#[derive(Debug, Clone)]
pub struct EventHubConfig {
    /// Event hub namespace.
    pub namespace: String,

    /// Event hub name.
    pub eventhub: String,

    /// Consumer group.
    pub consumer_group: String,

    /// Shared-access policy name.
    pub sas_policy: Option<String>,

    /// Shared-access policy key.
    pub sas_key: Option<String>,

    /// Storage account for the lease/checkpoint backend (consumer mode).
    pub storage_account: Option<String>,

    /// Storage access key for the lease/checkpoint backend (consumer mode).
    pub storage_key: Option<String>,

    /// Blob container holding partition leases.
    pub lease_container: Option<String>,

    /// Receive timeout; `None` waits indefinitely for an external stop.
    pub timeout: Option<Duration>,

    /// Operating mode derived from the storage credentials.
    pub mode: ClientMode,
}

impl EventHubConfig {
    /// Parses an [`EventHubConfig`] from a [`ClientConfig`].
    ///
    /// An unparsable `TIMEOUT` value means no timeout, matching the
    /// documented key contract.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the namespace or hub name
    /// is missing, or if exactly one of the two storage credentials is set.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let namespace = config.require(keys::EVENT_HUB_NAMESPACE)?.to_string();
        let eventhub = config.require(keys::EVENT_HUB_NAME)?.to_string();

        let consumer_group = config
            .get(keys::EVENT_HUB_CONSUMER_GROUP)
            .unwrap_or(DEFAULT_CONSUMER_GROUP)
            .to_string();

        let sas_policy = config.get(keys::EVENT_HUB_SAS_POLICY).map(String::from);
        let sas_key = config.get(keys::EVENT_HUB_SAS_KEY).map(String::from);

        let storage_account = config.get(keys::AZURE_STORAGE_ACCOUNT).map(String::from);
        let storage_key = config.get(keys::AZURE_STORAGE_ACCESS_KEY).map(String::from);
        let lease_container = config.get(keys::LEASE_CONTAINER_NAME).map(String::from);

        let mode = match (storage_account.is_some(), storage_key.is_some()) {
            (true, true) => ClientMode::Consumer,
            (false, false) => ClientMode::Producer,
            _ => {
                return Err(ClientError::Configuration(
                    "AZURE_STORAGE_ACCOUNT and AZURE_STORAGE_ACCESS_KEY must both be \
                     set (consumer mode) or both be absent (producer mode)"
                        .into(),
                ))
            }
        };

        let timeout = config
            .get(keys::TIMEOUT)
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);

        Ok(Self {
            namespace,
            eventhub,
            consumer_group,
            sas_policy,
            sas_key,
            storage_account,
            storage_key,
            lease_container,
            timeout,
            mode,
        })
    }

    /// Returns the AMQP address of the event hub.
    #[must_use]
    pub fn amqp_address(&self) -> String {
        format!(
            "amqps://{}.servicebus.windows.net/{}",
            self.namespace, self.eventhub
        )
    }
}
