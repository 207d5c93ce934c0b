//! Unified error type for Gatehouse.

use std::path::PathBuf;

use gatehouse_permissions::PermissionError;
use gatehouse_protocol::ProtocolError;
use gatehouse_router::{RouteError, RouterError};
use gatehouse_session::{SessionError, SessionParseError};
use gatehouse_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GatehouseError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    SessionParse(#[from] SessionParseError),

    /// Login failed, timed out or was superseded by a logout.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Preference(#[from] PreferenceError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Reading or writing persisted client preferences failed.
#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("preference file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("preference file {path:?} is not valid: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: ProtocolError,
    },
}

/// A client configuration that could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
