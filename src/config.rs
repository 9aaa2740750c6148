//! Client configuration types.
//!
//! [`ClientConfig`] is a string key-value configuration record with a kind
//! discriminator and typed accessors. For the broadcaster it additionally
//! carries an ordered list of sub-client specifications ([`ClientSpec`]),
//! each of which is either a nested configuration or a pre-built client
//! instance (the latter supports mocks and pre-wired clients).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::client::StreamingClient;
use crate::error::ClientError;

/// Well-known configuration keys. All keys are case-sensitive.
pub mod keys {
    /// Storage account name for the lease/checkpoint backend.
    pub const AZURE_STORAGE_ACCOUNT: &str = "AZURE_STORAGE_ACCOUNT";
    /// Storage account access key for the lease/checkpoint backend.
    pub const AZURE_STORAGE_ACCESS_KEY: &str = "AZURE_STORAGE_ACCESS_KEY";
    /// Blob container holding partition leases.
    pub const LEASE_CONTAINER_NAME: &str = "LEASE_CONTAINER_NAME";
    /// Event hub namespace.
    pub const EVENT_HUB_NAMESPACE: &str = "EVENT_HUB_NAMESPACE";
    /// Event hub name.
    pub const EVENT_HUB_NAME: &str = "EVENT_HUB_NAME";
    /// Consumer group; defaults to `$Default` when absent.
    pub const EVENT_HUB_CONSUMER_GROUP: &str = "EVENT_HUB_CONSUMER_GROUP";
    /// Shared-access policy name.
    pub const EVENT_HUB_SAS_POLICY: &str = "EVENT_HUB_SAS_POLICY";
    /// Shared-access policy key.
    pub const EVENT_HUB_SAS_KEY: &str = "EVENT_HUB_SAS_KEY";
    /// Processor host options as a JSON-encoded string.
    pub const EVENT_HUB_EPH_OPTIONS: &str = "EVENT_HUB_EPH_OPTIONS";
    /// Legacy debug flag; the string `"True"` enables debug tracing when
    /// no valid processor host options are supplied.
    pub const EVENT_HUB_DEBUG: &str = "EVENT_HUB_DEBUG";
    /// Receive timeout in integer seconds; unparsable values mean no timeout.
    pub const TIMEOUT: &str = "TIMEOUT";
}

/// Specification of one sub-client owned by a broadcaster.
#[derive(Clone)]
pub enum ClientSpec {
    /// A nested configuration, resolved through the client factory.
    Config(ClientConfig),

    /// A pre-built client instance, used as-is.
    Instance(Arc<dyn StreamingClient>),
}

impl fmt::Debug for ClientSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientSpec::Config(config) => f.debug_tuple("Config").field(config).finish(),
            ClientSpec::Instance(_) => f.debug_tuple("Instance").field(&"<client>").finish(),
        }
    }
}

/// Configuration record for a streaming client instance.
///
/// Consumed once at client construction; not retained beyond construction
/// except for derived fields.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// The client kind discriminator (e.g., "broadcast", "eventhub").
    kind: String,

    /// Configuration properties.
    properties: HashMap<String, String>,

    /// Sub-client specifications (broadcaster only).
    clients: Vec<ClientSpec>,
}

impl ClientConfig {
    /// Creates a new configuration with the given kind discriminator.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            properties: HashMap::new(),
            clients: Vec::new(),
        }
    }

    /// Creates a configuration from existing properties.
    #[must_use]
    pub fn with_properties(
        kind: impl Into<String>,
        properties: HashMap<String, String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            properties,
            clients: Vec::new(),
        }
    }

    /// Returns the kind discriminator.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Sets a configuration property.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Gets a configuration property.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Gets a required configuration property.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the key is not set.
    pub fn require(&self, key: &str) -> Result<&str, ClientError> {
        self.get(key)
            .ok_or_else(|| ClientError::Configuration(format!("missing required config: {key}")))
    }

    /// Gets a property parsed as the given type.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the value cannot be parsed.
    pub fn get_parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, ClientError>
    where
        T::Err: fmt::Display,
    {
        match self.get(key) {
            Some(v) => v.parse::<T>().map(Some).map_err(|e| {
                ClientError::Configuration(format!("invalid value for '{key}': {e}"))
            }),
            None => Ok(None),
        }
    }

    /// Appends a sub-client specification (broadcaster only).
    pub fn push_client(&mut self, spec: ClientSpec) {
        self.clients.push(spec);
    }

    /// Returns the ordered sub-client specifications.
    #[must_use]
    pub fn clients(&self) -> &[ClientSpec] {
        &self.clients
    }

    /// Returns all properties as a reference.
    #[must_use]
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let mut config = ClientConfig::new("eventhub");
        config.set(keys::EVENT_HUB_NAMESPACE, "my-namespace");
        config.set(keys::EVENT_HUB_NAME, "my-hub");

        assert_eq!(config.kind(), "eventhub");
        assert_eq!(config.get(keys::EVENT_HUB_NAMESPACE), Some("my-namespace"));
        assert_eq!(config.get(keys::EVENT_HUB_NAME), Some("my-hub"));
        assert_eq!(config.get("missing"), None);
    }

    #[test]
    fn test_require() {
        let mut config = ClientConfig::new("eventhub");
        config.set(keys::EVENT_HUB_NAME, "my-hub");

        assert!(config.require(keys::EVENT_HUB_NAME).is_ok());
        let err = config.require(keys::EVENT_HUB_NAMESPACE).unwrap_err();
        assert!(err.to_string().contains("EVENT_HUB_NAMESPACE"));
    }

    #[test]
    fn test_get_parsed() {
        let mut config = ClientConfig::new("eventhub");
        config.set(keys::TIMEOUT, "30");
        config.set("bad", "not_a_number");

        let timeout: Option<u64> = config.get_parsed(keys::TIMEOUT).unwrap();
        assert_eq!(timeout, Some(30));

        let missing: Option<u64> = config.get_parsed("missing").unwrap();
        assert_eq!(missing, None);

        let bad: Result<Option<u64>, _> = config.get_parsed("bad");
        assert!(bad.is_err());
    }

    #[test]
    fn test_with_properties() {
        let mut props = HashMap::new();
        props.insert(keys::EVENT_HUB_NAMESPACE.to_string(), "ns".to_string());

        let config = ClientConfig::with_properties("eventhub", props);
        assert_eq!(config.get(keys::EVENT_HUB_NAMESPACE), Some("ns"));
    }

    #[test]
    fn test_sub_clients() {
        let mut config = ClientConfig::new("broadcast");
        assert!(config.clients().is_empty());

        config.push_client(ClientSpec::Config(ClientConfig::new("eventhub")));
        assert_eq!(config.clients().len(), 1);
        assert!(matches!(config.clients()[0], ClientSpec::Config(_)));
    }

    #[test]
    fn test_spec_debug() {
        let spec = ClientSpec::Config(ClientConfig::new("eventhub"));
        assert!(format!("{spec:?}").contains("eventhub"));
    }
}
