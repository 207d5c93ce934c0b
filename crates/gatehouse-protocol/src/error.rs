//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding protocol payloads.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, wrong types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The payload decoded but violates the backend contract, e.g. a
    /// method response without a `message`.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}
