//! Shared vocabulary for Gatehouse.
//!
//! This crate defines the types every other layer speaks:
//!
//! - **Identity** ([`Identity`]): who the visitor is, and whether that
//!   "who" is the anonymous guest.
//! - **Capabilities** ([`Capability`], [`PermissionSet`]): the closed set of
//!   named permission flags and the fail-closed map that holds them.
//! - **Wire types** ([`LoginRequest`], [`MethodResponse`], ...): the JSON
//!   shapes exchanged with the backend.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes to types and back.
//!
//! # Architecture
//!
//! ```text
//! Transport (HTTP) → Protocol (typed payloads) → Session / Permissions
//! ```
//!
//! Nothing here performs I/O.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Capability, GUEST_SENTINEL, Identity, LoginRequest, LoginResponse,
    MethodResponse, PermissionSet, Profile, ResourceResponse, UserRecord,
};
