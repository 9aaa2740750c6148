//! Streaming client core: a uniform send/receive contract over
//! partitioned event hubs, with configuration-driven construction and a
//! fan-out broadcaster.
//!
//! # Architecture
//!
//! - [`client`]: the [`StreamingClient`](client::StreamingClient)
//!   contract every client implements
//! - [`factory`]: builds clients from configuration records
//! - [`broadcast`]: replicates sends across a fixed set of clients
//! - [`eventhub`]: partitioned consumer/producer with leases and
//!   per-batch checkpointing
//! - [`signal`]: routes process termination signals to running consumers
//! - [`testing`]: in-memory doubles for the transport contracts
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hubcast::config::{keys, ClientConfig};
//! use hubcast::factory::ClientFactory;
//! use hubcast::testing::MockTransport;
//!
//! # fn main() -> Result<(), hubcast::error::ClientError> {
//! let mut config = ClientConfig::new("eventhub");
//! config.set(keys::EVENT_HUB_NAMESPACE, "my-namespace");
//! config.set(keys::EVENT_HUB_NAME, "my-hub");
//!
//! let factory = ClientFactory::new(Arc::new(MockTransport::new()));
//! let client = factory.create_from_config(&config)?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod broadcast;
pub mod client;
pub mod config;
pub mod error;
pub mod eventhub;
pub mod factory;
pub mod metrics;
pub mod signal;
pub mod testing;

pub use broadcast::BroadcastStreamingClient;
pub use client::{ClientState, MessageCallback, StreamingClient};
pub use config::{ClientConfig, ClientSpec};
pub use error::ClientError;
pub use eventhub::config::ClientMode;
pub use eventhub::EventHubStreamingClient;
pub use factory::{ClientFactory, ClientKind};
