//! Route declarations.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::RouteError;

// ---------------------------------------------------------------------------
// RouteClass
// ---------------------------------------------------------------------------

/// Whether a route needs a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    /// Reachable only without a session (the login view).
    Public,
    /// Reachable only with a session.
    Protected,
}

impl std::fmt::Display for RouteClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "Public"),
            Self::Protected => write!(f, "Protected"),
        }
    }
}

// ---------------------------------------------------------------------------
// RouteDescriptor
// ---------------------------------------------------------------------------

/// One declared route. Static for the lifetime of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub path: String,
    pub name: String,
    pub requires_auth: bool,
}

impl RouteDescriptor {
    pub fn protected(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            requires_auth: true,
        }
    }

    pub fn public(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            requires_auth: false,
        }
    }

    pub fn class(&self) -> RouteClass {
        if self.requires_auth {
            RouteClass::Protected
        } else {
            RouteClass::Public
        }
    }
}

// ---------------------------------------------------------------------------
// RouteTable
// ---------------------------------------------------------------------------

/// The declared routes plus the login and home routes.
///
/// Construction validates that redirects always terminate: the login route
/// is public and the home route is protected. Both are resolved to indices
/// into `routes` at that point, so lookups of them cannot fail afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRouteTable", into = "RawRouteTable")]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
    login: usize,
    home: usize,
}

#[derive(Serialize, Deserialize)]
struct RawRouteTable {
    routes: Vec<RouteDescriptor>,
    login: String,
    home: String,
}

impl TryFrom<RawRouteTable> for RouteTable {
    type Error = RouteError;

    fn try_from(raw: RawRouteTable) -> Result<Self, Self::Error> {
        Self::new(raw.routes, raw.login, raw.home)
    }
}

impl From<RouteTable> for RawRouteTable {
    fn from(table: RouteTable) -> Self {
        let login = table.login_route().name.clone();
        let home = table.home_route().name.clone();
        Self {
            routes: table.routes,
            login,
            home,
        }
    }
}

impl Default for RouteTable {
    /// `/` Home and `/invoice` InvoiceForm behind login, `/login` Login
    /// public.
    fn default() -> Self {
        Self {
            routes: vec![
                RouteDescriptor::protected("/", "Home"),
                RouteDescriptor::protected("/invoice", "InvoiceForm"),
                RouteDescriptor::public("/login", "Login"),
            ],
            login: 2,
            home: 0,
        }
    }
}

impl RouteTable {
    /// Builds and validates a table. `login` and `home` are route names.
    ///
    /// # Errors
    /// See [`RouteError`].
    pub fn new(
        routes: Vec<RouteDescriptor>,
        login: impl Into<String>,
        home: impl Into<String>,
    ) -> Result<Self, RouteError> {
        let mut routes = routes;
        let mut seen = HashSet::new();
        for route in &mut routes {
            if !route.path.starts_with('/') {
                return Err(RouteError::RelativePath(route.path.clone()));
            }
            route.path = normalize(&route.path).to_string();
            if !seen.insert(route.path.clone()) {
                return Err(RouteError::DuplicatePath(route.path.clone()));
            }
        }

        let login = position(&routes, login.into())?;
        if routes[login].requires_auth {
            return Err(RouteError::LoginRouteProtected(routes[login].name.clone()));
        }
        let home = position(&routes, home.into())?;
        if !routes[home].requires_auth {
            return Err(RouteError::HomeRoutePublic(routes[home].name.clone()));
        }
        Ok(Self {
            routes,
            login,
            home,
        })
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    /// The declared route at `path`. Query, fragment and a trailing `/`
    /// are ignored.
    pub fn lookup(&self, path: &str) -> Option<&RouteDescriptor> {
        let path = normalize(path);
        self.routes.iter().find(|r| r.path == path)
    }

    pub fn by_name(&self, name: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// The class of `path`. Undeclared paths are [`RouteClass::Protected`].
    pub fn classify(&self, path: &str) -> RouteClass {
        self.lookup(path)
            .map_or(RouteClass::Protected, RouteDescriptor::class)
    }

    /// The route unauthenticated visitors are sent to.
    pub fn login_route(&self) -> &RouteDescriptor {
        &self.routes[self.login]
    }

    /// The default landing route after login.
    pub fn home_route(&self) -> &RouteDescriptor {
        &self.routes[self.home]
    }
}

fn position(routes: &[RouteDescriptor], name: String) -> Result<usize, RouteError> {
    routes
        .iter()
        .position(|r| r.name == name)
        .ok_or(RouteError::UnknownRoute(name))
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}
