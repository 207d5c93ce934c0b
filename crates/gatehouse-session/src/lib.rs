//! Session state and authentication for Gatehouse.
//!
//! This crate owns the answer to "is the visitor logged in, and as whom":
//!
//! 1. **Evidence parsing**: turning a cookie-style string into a
//!    [`SessionState`] ([`parse_evidence`], [`SessionState::from_evidence`])
//! 2. **Transitions**: [`Authenticator`] performs login and logout against a
//!    [`SessionEndpoint`](gatehouse_transport::SessionEndpoint) and is the
//!    only writer of the session state
//! 3. **Invalidation**: caches keyed by identity register an [`Invalidate`]
//!    hook and are cleared before any new identity becomes visible
//!
//! # How it fits in the stack
//!
//! ```text
//! Router / Permissions (above)  ← read SessionState, subscribe to changes
//!     ↕
//! Session Layer (this crate)    ← owns identity and login state
//!     ↕
//! Transport / Protocol (below)  ← endpoints, Identity type
//! ```

mod auth;
mod error;
mod evidence;
mod session;

pub use auth::{Authenticator, Invalidate, SessionResult};
pub use error::{SessionError, SessionParseError};
pub use evidence::{Evidence, IDENTITY_KEY, parse_evidence};
pub use session::{SessionConfig, SessionState};
