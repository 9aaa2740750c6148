//! Streaming client error types.
//!
//! Provides the error hierarchy for all client operations:
//! - [`ClientError`]: Top-level error for client construction and runtime I/O
//! - [`OptionsParseError`]: Event processor host options parse failures
//!
//! Construction-time misconfiguration is fatal and surfaced immediately.
//! Steady-state I/O errors are local and recovered: send failures degrade to
//! a `false` return, receive-path failures are logged and reported to the
//! processor host without stopping sibling partitions.

use thiserror::Error;

/// Errors that can occur during streaming client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Malformed or contradictory configuration. Raised at construction;
    /// the caller must not proceed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The operation is undefined for this client variant.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// The backend rejected or failed a send. Surfaced to callers only as
    /// `send` returning `false`, never propagated.
    #[error("send failed: {0}")]
    Send(String),

    /// Error while handling a batch on one partition. Reported to the
    /// processor host; does not stop sibling partitions.
    #[error("partition processing error: {0}")]
    Processing(String),

    /// Checkpoint or lease operation against the storage backend failed.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// Failure in the underlying wire transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// The client has been stopped.
    #[error("client stopped")]
    Closed,

    /// An I/O error from the underlying system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that occur while parsing event processor host options.
///
/// These are never surfaced to callers: the options parser recovers by
/// discarding the malformed input and falling back to the default set,
/// logging a warning.
#[derive(Debug, Error)]
pub enum OptionsParseError {
    /// The raw options value was not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(String),

    /// The options value was valid JSON but not an object, or a field
    /// could not be coerced to its target type.
    #[error("type error: {0}")]
    Type(String),
}

impl From<serde_json::Error> for OptionsParseError {
    fn from(e: serde_json::Error) -> Self {
        OptionsParseError::Type(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_display() {
        let err = ClientError::Configuration("unknown client kind: 'mqtt'".into());
        assert_eq!(
            err.to_string(),
            "configuration error: unknown client kind: 'mqtt'"
        );
    }

    #[test]
    fn test_not_supported_display() {
        let err = ClientError::NotSupported("broadcast clients cannot receive".into());
        assert!(err.to_string().contains("cannot receive"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: ClientError = io.into();
        assert!(matches!(err, ClientError::Io(_)));
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_options_parse_error_from_json() {
        let bad: Result<serde_json::Value, _> = serde_json::from_str("{nope");
        let err: OptionsParseError = bad.unwrap_err().into();
        assert!(matches!(err, OptionsParseError::Type(_)));
    }
}
