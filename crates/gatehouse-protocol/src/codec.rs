//! Codec trait and implementations for backend payloads.
//!
//! The HTTP backend and the preference file both move typed values in and
//! out of bytes. They go through [`Codec`] so the format is swappable and
//! decode failures surface as [`ProtocolError`] instead of a
//! format-specific error type.

use serde::{Serialize, de::DeserializeOwned};

use crate::{MethodResponse, ProtocolError};

/// Encodes Rust values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because a codec lives inside the long-lived
/// backend that spawned permission loads share.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do not
    /// match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Decodes a `{ "message": ... }` method envelope and unwraps it.
    ///
    /// # Errors
    /// Returns `ProtocolError::InvalidPayload` when the envelope carries no
    /// `message`, in addition to the errors of [`decode`](Self::decode).
    fn decode_message<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        let envelope: MethodResponse<T> = self.decode(data)?;
        envelope
            .message
            .ok_or_else(|| ProtocolError::InvalidPayload("response has no message".into()))
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`. The backend speaks JSON, so this is
/// the only codec shipped today.
///
/// ## Example
///
/// ```rust
/// use gatehouse_protocol::{Capability, Codec, JsonCodec, PermissionSet};
///
/// let codec = JsonCodec;
/// let body = br#"{"message": {"can_submit_invoice": true, "can_login": 1}}"#;
///
/// let set: PermissionSet = codec.decode_message(body).unwrap();
/// assert!(set.get(Capability::SubmitInvoice));
/// // Only a literal `true` grants a capability.
/// assert!(!set.get(Capability::Login));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
