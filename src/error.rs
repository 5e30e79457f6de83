//! Bridge error types.
//!
//! None of these ever reach the host: the registry logs them and moves on.
//! They exist so callers and tests can see *why* an event was dropped.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Invalid payload for {event}: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Duplicate {kind} '{id}' ignored")]
    DuplicateEntity { kind: &'static str, id: String },

    #[error("Bridge is not connected")]
    NotConnected,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Texture load failed for {url}: {reason}")]
    TextureLoad { url: String, reason: String },

    #[error("Hotspot scan failed: {0}")]
    Hotspot(#[from] gltf::Error),

    #[cfg(feature = "headless")]
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Result type alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
