//! # Gatehouse
//!
//! Client-side session and access control for a single-page application:
//! who the visitor is, what they may do, and which views they may reach.
//!
//! The application wires one [`AppContext`] at start-up. It owns the
//! authenticator, the permission store and the router, constructed in that
//! order, so identity changes always clear cached permissions before any
//! view can observe the new identity.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gatehouse::prelude::*;
//!
//! # async fn run() -> Result<(), GatehouseError> {
//! let config = ClientConfig::default();
//! let backend = HttpBackend::new(config.http())?;
//! let ctx = AppContextBuilder::new()
//!     .config(config)
//!     .evidence("user_id=alice%40example.com")
//!     .build(backend);
//!
//! ctx.start().await;
//! let outcome = ctx.navigate("/invoice")?;
//! println!("now at {}", outcome.location());
//! # Ok(())
//! # }
//! ```

mod config;
mod context;
mod error;
mod logging;
mod preferences;

pub use config::ClientConfig;
pub use context::{AppContext, AppContextBuilder, Backend, LoginOutcome, Reloader};
pub use error::{ConfigError, GatehouseError, PreferenceError};
pub use logging::init_tracing;
pub use preferences::{FilePreferences, MemoryPreferences, PREFERRED_LOCALE_KEY, PreferenceStore};

/// Everything an application needs, in one import.
pub mod prelude {
    pub use crate::{
        AppContext, AppContextBuilder, Backend, ClientConfig, FilePreferences, GatehouseError,
        LoginOutcome, MemoryPreferences, PreferenceStore, Reloader, init_tracing,
    };
    pub use gatehouse_permissions::{LoadOutcome, PermissionConfig, PermissionStore, RetryConfig};
    pub use gatehouse_protocol::{Capability, Identity, LoginResponse, PermissionSet, Profile};
    pub use gatehouse_router::{
        GuardDecision, Location, NavigationGuard, NavigationOutcome, RouteDescriptor, RouteTable,
        Router,
    };
    pub use gatehouse_session::{Authenticator, SessionError, SessionState};
    pub use gatehouse_transport::{
        HttpBackend, HttpConfig, PermissionEndpoint, ProfileEndpoint, SessionEndpoint,
        TransportError,
    };
}
