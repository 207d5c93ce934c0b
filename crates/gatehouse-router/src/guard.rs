//! The pre-navigation decision.

use gatehouse_session::SessionState;
use serde::{Deserialize, Serialize};

use crate::location::parse_query;
use crate::{Location, RouteClass, RouteTable};

/// The query parameter carrying the path to resume after login.
pub const RESUME_PARAM: &str = "route";

// ---------------------------------------------------------------------------
// AuthState
// ---------------------------------------------------------------------------

/// The only thing the guard knows about the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
}

impl From<&SessionState> for AuthState {
    fn from(session: &SessionState) -> Self {
        if session.is_logged_in() {
            Self::Authenticated
        } else {
            Self::Unauthenticated
        }
    }
}

// ---------------------------------------------------------------------------
// GuardDecision
// ---------------------------------------------------------------------------

/// What the guard decided for one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Go to the login route, then come back to `resume`.
    RedirectToLogin { resume: String },
    /// Go to the home route.
    RedirectToHome,
}

impl GuardDecision {
    /// The full decision table.
    ///
    /// | state           | class     | decision        |
    /// |-----------------|-----------|-----------------|
    /// | Unauthenticated | Protected | RedirectToLogin |
    /// | Unauthenticated | Public    | Allow           |
    /// | Authenticated   | Public    | RedirectToHome  |
    /// | Authenticated   | Protected | Allow           |
    pub fn evaluate(state: AuthState, class: RouteClass, requested: &str) -> Self {
        match (state, class) {
            (AuthState::Unauthenticated, RouteClass::Protected) => Self::RedirectToLogin {
                resume: requested.to_string(),
            },
            (AuthState::Authenticated, RouteClass::Public) => Self::RedirectToHome,
            (AuthState::Unauthenticated, RouteClass::Public)
            | (AuthState::Authenticated, RouteClass::Protected) => Self::Allow,
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

// ---------------------------------------------------------------------------
// NavigationGuard
// ---------------------------------------------------------------------------

/// Decides every navigation from the route table and the session.
///
/// Pure and synchronous: the same session and target always give the same
/// decision, and nothing is awaited.
#[derive(Debug, Clone, Default)]
pub struct NavigationGuard {
    table: RouteTable,
}

impl NavigationGuard {
    pub fn new(table: RouteTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Decides whether `target` may be entered with `session`.
    pub fn check(&self, session: &SessionState, target: &Location) -> GuardDecision {
        GuardDecision::evaluate(
            AuthState::from(session),
            self.table.classify(target.path()),
            target.path(),
        )
    }

    /// The location a decision sends the visitor to. `None` for
    /// [`GuardDecision::Allow`].
    pub fn redirect_location(&self, decision: &GuardDecision) -> Option<Location> {
        match decision {
            GuardDecision::Allow => None,
            GuardDecision::RedirectToLogin { resume } => Some(
                Location::new(self.table.login_route().path.clone())
                    .with_param(RESUME_PARAM, resume.clone()),
            ),
            GuardDecision::RedirectToHome => {
                Some(Location::new(self.table.home_route().path.clone()))
            }
        }
    }

    /// The path to continue to after login, read from the `route` parameter
    /// of the login page's `query`.
    ///
    /// Only same-origin absolute paths are honored (`/invoice`, not
    /// `//evil.example` or `https://...`). Anything else yields the home
    /// route.
    pub fn resume_target(&self, query: &str) -> String {
        let requested = parse_query(query)
            .into_iter()
            .find(|(key, _)| key == RESUME_PARAM)
            .map(|(_, value)| value);

        match requested {
            Some(path) if is_same_origin_path(&path) => path,
            Some(path) => {
                tracing::warn!(path = %path, "ignoring off-site resume target");
                self.table.home_route().path.clone()
            }
            None => self.table.home_route().path.clone(),
        }
    }
}

fn is_same_origin_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}
