//! Backend endpoint abstractions for Gatehouse.
//!
//! The session core never talks HTTP directly. It consumes three
//! collaborator traits:
//!
//! - [`SessionEndpoint`]: login and logout.
//! - [`PermissionEndpoint`]: the capability query, keyed by identity.
//! - [`ProfileEndpoint`]: current identity and profile lookup, used to
//!   bootstrap the preferred locale.
//!
//! [`HttpBackend`] implements all three against the backend's REST API.
//! Tests implement them with in-memory fakes.
//!
//! # Feature Flags
//!
//! - `http` (default): [`HttpBackend`] via `reqwest`

mod error;
#[cfg(feature = "http")]
mod http;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::{DEFAULT_PERMISSION_METHOD, HttpBackend, HttpConfig};

use std::future::Future;
use std::sync::Arc;

use gatehouse_protocol::{LoginResponse, PermissionSet, Profile};

/// The backend's session endpoint.
pub trait SessionEndpoint: Send + Sync + 'static {
    /// Submits credentials.
    ///
    /// Rejected credentials are `Ok` with `success == false`; `Err` means
    /// the endpoint itself failed (network, unexpected status, bad body).
    fn login(
        &self,
        identity: &str,
        secret: &str,
    ) -> impl Future<Output = Result<LoginResponse, TransportError>> + Send;

    /// Ends the server-side session.
    fn logout(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// The backend's permission query.
pub trait PermissionEndpoint: Send + Sync + 'static {
    /// Fetches the capability set for `identity`. The identity is always
    /// passed explicitly, never inferred from the ambient session.
    fn get_permissions(
        &self,
        identity: &str,
    ) -> impl Future<Output = Result<PermissionSet, TransportError>> + Send;
}

/// Identity and profile lookups used during boot.
pub trait ProfileEndpoint: Send + Sync + 'static {
    /// The identity the backend associates with the current session, or
    /// `None` when there is no session.
    fn current_identity(
        &self,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;

    /// The stored profile of `identity`.
    fn profile(
        &self,
        identity: &str,
    ) -> impl Future<Output = Result<Profile, TransportError>> + Send;
}

// One backend value is usually shared by the authenticator, the permission
// store and the profile bootstrap, so every endpoint is also implemented
// for `Arc<T>`.

impl<T: SessionEndpoint> SessionEndpoint for Arc<T> {
    fn login(
        &self,
        identity: &str,
        secret: &str,
    ) -> impl Future<Output = Result<LoginResponse, TransportError>> + Send {
        (**self).login(identity, secret)
    }

    fn logout(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).logout()
    }
}

impl<T: PermissionEndpoint> PermissionEndpoint for Arc<T> {
    fn get_permissions(
        &self,
        identity: &str,
    ) -> impl Future<Output = Result<PermissionSet, TransportError>> + Send {
        (**self).get_permissions(identity)
    }
}

impl<T: ProfileEndpoint> ProfileEndpoint for Arc<T> {
    fn current_identity(
        &self,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send {
        (**self).current_identity()
    }

    fn profile(
        &self,
        identity: &str,
    ) -> impl Future<Output = Result<Profile, TransportError>> + Send {
        (**self).profile(identity)
    }
}
