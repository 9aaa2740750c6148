//! Processor host tuning options.
//!
//! [`EphOptions`] govern batch size, prefetch, timeouts, and reconnect
//! behavior of the processor host. User-supplied options arrive in one of
//! several shapes (absent, JSON string, structured mapping, or an already
//! typed value) and are normalized at this boundary into one typed
//! structure; the union never travels further into the system.
//!
//! Any parse or type-coercion failure discards the entire user-supplied
//! object and falls back to the default set plus the legacy debug flag,
//! never a half-merged result.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{keys, ClientConfig};
use crate::error::OptionsParseError;

/// Tunable parameters of the processor host.
///
/// All numeric fields are non-negative; values that fail to coerce reject
/// the whole user object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EphOptions {
    /// Maximum events delivered per batch.
    pub max_batch_size: u32,

    /// Events prefetched ahead of processing.
    pub prefetch_count: u32,

    /// Receive timeout in seconds.
    pub receive_timeout: u32,

    /// Keep-alive interval in seconds; `None` disables keep-alives.
    pub keep_alive_interval: Option<u32>,

    /// Where to begin reading a partition with no checkpoint.
    pub initial_offset_provider: Option<String>,

    /// Enables transport-level debug tracing.
    pub debug_trace: bool,

    /// Reconnects the receive link automatically after transport errors.
    pub auto_reconnect_on_error: bool,

    /// HTTP proxy address for the transport.
    pub http_proxy: Option<String>,
}

impl Default for EphOptions {
    fn default() -> Self {
        Self {
            max_batch_size: 10,
            prefetch_count: 300,
            receive_timeout: 60,
            keep_alive_interval: None,
            initial_offset_provider: None,
            debug_trace: false,
            auto_reconnect_on_error: false,
            http_proxy: None,
        }
    }
}

/// Raw, not-yet-normalized options value.
#[derive(Debug, Clone)]
pub enum RawEphOptions {
    /// A JSON-encoded string.
    Json(String),

    /// A structured mapping.
    Map(serde_json::Map<String, serde_json::Value>),

    /// An already-typed options value, used as-is.
    Typed(EphOptions),
}

impl EphOptions {
    /// Normalizes a raw options value into a fully populated [`EphOptions`].
    ///
    /// Fields present in a well-formed input override the corresponding
    /// defaults. On any failure the result is the full default set with
    /// `debug_trace` taken from the legacy flag.
    #[must_use]
    pub fn resolve(raw: Option<RawEphOptions>, legacy_debug: bool) -> Self {
        let options = match raw {
            None => {
                debug!("no processor host options supplied, using defaults");
                Self::fallback(legacy_debug)
            }
            Some(RawEphOptions::Typed(options)) => options,
            Some(RawEphOptions::Json(text)) => match serde_json::from_str(&text) {
                Ok(value) => Self::from_value(value).unwrap_or_else(|error| {
                    warn!(%error, "could not coerce processor host options, using defaults");
                    Self::fallback(legacy_debug)
                }),
                Err(error) => {
                    warn!(
                        %error,
                        "could not parse processor host options string, expecting JSON; \
                         using defaults"
                    );
                    Self::fallback(legacy_debug)
                }
            },
            Some(RawEphOptions::Map(map)) => {
                Self::from_value(serde_json::Value::Object(map)).unwrap_or_else(|error| {
                    warn!(%error, "could not coerce processor host options, using defaults");
                    Self::fallback(legacy_debug)
                })
            }
        };

        debug!(debug_trace = options.debug_trace, "processor host options resolved");
        options
    }

    /// Reads and normalizes the options from a [`ClientConfig`].
    #[must_use]
    pub fn from_client_config(config: &ClientConfig) -> Self {
        let legacy_debug = config.get(keys::EVENT_HUB_DEBUG) == Some("True");
        let raw = config
            .get(keys::EVENT_HUB_EPH_OPTIONS)
            .map(|text| RawEphOptions::Json(text.to_string()));
        Self::resolve(raw, legacy_debug)
    }

    fn from_value(value: serde_json::Value) -> Result<Self, OptionsParseError> {
        if !value.is_object() {
            return Err(OptionsParseError::Type(format!(
                "expected a JSON object, got {value}"
            )));
        }
        serde_json::from_value(value).map_err(OptionsParseError::from)
    }

    fn fallback(legacy_debug: bool) -> Self {
        Self {
            debug_trace: legacy_debug,
            ..Self::default()
        }
    }
}
