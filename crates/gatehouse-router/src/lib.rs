//! Navigation for Gatehouse.
//!
//! Three layers, each usable on its own:
//!
//! - [`RouteTable`]: the declared routes and which of them are public
//! - [`NavigationGuard`]: a pure decision function over
//!   (logged in?, route class)
//! - [`Router`]: applies the guard to every navigation against the live
//!   session and publishes the current [`Location`]
//!
//! The guard only ever looks at `is_logged_in`. Capability checks happen
//! inside views, against the permission store.

mod error;
mod guard;
mod location;
mod router;
mod routes;

pub use error::{RouteError, RouterError};
pub use guard::{AuthState, GuardDecision, NavigationGuard, RESUME_PARAM};
pub use location::Location;
pub use router::{NavigationOutcome, Router};
pub use routes::{RouteClass, RouteDescriptor, RouteTable};
