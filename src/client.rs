//! The streaming client contract.
//!
//! [`StreamingClient`] is the polymorphic interface every backend
//! implements: send one message, run a blocking receive loop that invokes
//! a callback per message, and stop.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ClientError;

/// Per-message handler invoked by the receive loop.
///
/// Called exactly once per received message, synchronously, before the
/// message's batch is acknowledged or checkpointed.
pub type MessageCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Uniform contract for exchanging opaque string messages with an
/// external event-streaming backend.
///
/// # Contract
///
/// - `send` returns `true` iff the message was accepted by the backend.
///   This is a delivery guarantee, not a durability guarantee. Transport
///   failures are logged and surfaced only through the `false` return.
/// - `start_receiving` blocks the calling task until `stop` is invoked,
///   a configured timeout elapses, or a fatal error occurs. Within a
///   partition, messages reach the callback in delivery order.
/// - `stop` is idempotent and safe to call from a different task than the
///   one blocked in `start_receiving` (notably, from a termination-signal
///   handler). Calling it twice produces the same end state as calling it
///   once.
#[async_trait]
pub trait StreamingClient: Send + Sync + fmt::Debug {
    /// Sends one message, returning `true` iff the backend accepted it.
    async fn send(&self, message: &str) -> bool;

    /// Runs the receive loop, invoking `callback` once per message.
    ///
    /// Blocks until stopped.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotSupported`] for variants without receive
    /// semantics, or [`ClientError`] if the receive loop cannot be opened.
    async fn start_receiving(&self, callback: MessageCallback) -> Result<(), ClientError>;

    /// Stops the client and releases its resources. Idempotent.
    async fn stop(&self);
}

/// Lifecycle state of a receiving client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Client has been constructed but is not yet receiving.
    Created,

    /// The receive loop is running.
    Receiving,

    /// Stop was requested; per-partition tasks are being cancelled.
    Stopping,

    /// The receive loop has completed and resources are released.
    Stopped,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientState::Created => write!(f, "Created"),
            ClientState::Receiving => write!(f, "Receiving"),
            ClientState::Stopping => write!(f, "Stopping"),
            ClientState::Stopped => write!(f, "Stopped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_state_display() {
        assert_eq!(ClientState::Created.to_string(), "Created");
        assert_eq!(ClientState::Receiving.to_string(), "Receiving");
        assert_eq!(ClientState::Stopping.to_string(), "Stopping");
        assert_eq!(ClientState::Stopped.to_string(), "Stopped");
    }
}
