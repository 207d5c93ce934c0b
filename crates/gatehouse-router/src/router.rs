//! Guarded navigation against the live session.

use gatehouse_session::SessionState;
use tokio::sync::watch;

use crate::{GuardDecision, Location, NavigationGuard, RouterError};

/// Where a navigation ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The requested location was entered.
    Arrived(Location),
    /// The guard sent the visitor to `to` instead of `requested`.
    Redirected { requested: Location, to: Location },
}

impl NavigationOutcome {
    /// The location that is now current.
    pub fn location(&self) -> &Location {
        match self {
            Self::Arrived(location) | Self::Redirected { to: location, .. } => location,
        }
    }
}

/// Runs the [`NavigationGuard`] before every navigation and publishes the
/// current [`Location`].
///
/// The session is read through a `watch` receiver, so every decision sees
/// the state committed by the latest login or logout.
pub struct Router {
    guard: NavigationGuard,
    session: watch::Receiver<SessionState>,
    current: watch::Sender<Option<Location>>,
}

impl Router {
    pub fn new(guard: NavigationGuard, session: watch::Receiver<SessionState>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            guard,
            session,
            current,
        }
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    /// The location entered last, `None` before the first navigation.
    pub fn current(&self) -> Option<Location> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Location>> {
        self.current.subscribe()
    }

    /// Navigates to `href`, following at most one guard redirect.
    ///
    /// # Errors
    /// - [`RouterError::InvalidHref`] for a relative `href`
    /// - [`RouterError::RedirectLoop`] when the redirect target is itself
    ///   redirected (cannot happen with a validated [`RouteTable`](crate::RouteTable))
    pub fn navigate(&self, href: &str) -> Result<NavigationOutcome, RouterError> {
        let requested = Location::parse(href)?;
        let session = self.session.borrow().clone();

        let decision = self.guard.check(&session, &requested);
        let Some(redirect) = self.guard.redirect_location(&decision) else {
            tracing::debug!(to = %requested, "navigation allowed");
            self.current.send_replace(Some(requested.clone()));
            return Ok(NavigationOutcome::Arrived(requested));
        };

        if self.guard.check(&session, &redirect) != GuardDecision::Allow {
            return Err(RouterError::RedirectLoop {
                from: requested.href(),
                to: redirect.href(),
            });
        }

        tracing::debug!(from = %requested, to = %redirect, "navigation redirected");
        self.current.send_replace(Some(redirect.clone()));
        Ok(NavigationOutcome::Redirected {
            requested,
            to: redirect,
        })
    }

    /// Continues to the path preserved on the login page, or home.
    ///
    /// Call once the session has been committed.
    pub fn after_login(&self) -> Result<NavigationOutcome, RouterError> {
        let query = self
            .current
            .borrow()
            .as_ref()
            .filter(|location| location.path() == self.guard.table().login_route().path)
            .map(Location::query_string)
            .unwrap_or_default();
        let target = self.guard.resume_target(&query);
        self.navigate(&target)
    }

    /// Re-runs the guard on the current location, for example after the
    /// session changed underneath it.
    pub fn revalidate(&self) -> Result<Option<NavigationOutcome>, RouterError> {
        match self.current() {
            Some(location) => self.navigate(&location.href()).map(Some),
            None => Ok(None),
        }
    }
}
