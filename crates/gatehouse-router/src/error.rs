//! Error types for routing.

/// A route table that cannot guarantee loop-free redirects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("route name {0:?} is not declared")]
    UnknownRoute(String),

    #[error("path {0:?} is declared more than once")]
    DuplicatePath(String),

    #[error("path {0:?} must start with '/'")]
    RelativePath(String),

    /// Unauthenticated visitors are sent to the login route, so it must
    /// be reachable without a session.
    #[error("login route {0:?} must be public")]
    LoginRouteProtected(String),

    /// Authenticated visitors are sent to the home route, so it must not
    /// bounce them again.
    #[error("home route {0:?} must require authentication")]
    HomeRoutePublic(String),
}

/// Errors from [`Router`](crate::Router) navigation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    #[error("invalid location {0:?}: must be an absolute path")]
    InvalidHref(String),

    /// A redirect target was itself redirected.
    #[error("redirect loop: {from} -> {to}")]
    RedirectLoop { from: String, to: String },
}
