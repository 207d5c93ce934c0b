//! `AppContext` builder and session lifecycle.
//!
//! This is the entry point for an application. It ties together all the
//! layers in a fixed order:
//!
//! ```text
//! SessionState (from evidence)
//!   → Authenticator        owns the session
//!   → PermissionStore      registered as the authenticator's invalidation hook
//!   → Router               guards navigation against the live session
//! ```

use std::future::Future;
use std::sync::Arc;

use gatehouse_permissions::PermissionStore;
use gatehouse_protocol::{Capability, Identity};
use gatehouse_router::{NavigationGuard, NavigationOutcome, Router};
use gatehouse_session::{Authenticator, Invalidate, SessionResult, SessionState};
use gatehouse_transport::{PermissionEndpoint, ProfileEndpoint, SessionEndpoint, TransportError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use crate::{
    ClientConfig, FilePreferences, GatehouseError, MemoryPreferences, PREFERRED_LOCALE_KEY,
    PreferenceStore,
};

/// A backend serving every endpoint Gatehouse talks to.
///
/// Implemented automatically for any type implementing the three endpoint
/// traits, such as [`HttpBackend`](gatehouse_transport::HttpBackend).
pub trait Backend: SessionEndpoint + PermissionEndpoint + ProfileEndpoint {}

impl<T> Backend for T where T: SessionEndpoint + PermissionEndpoint + ProfileEndpoint {}

/// Full application reset, run after logout.
///
/// A browser application reloads the page here. Closures implement it.
pub trait Reloader: Send + Sync {
    fn reload(&self);
}

impl<F> Reloader for F
where
    F: Fn() + Send + Sync,
{
    fn reload(&self) {
        self()
    }
}

/// What a successful [`AppContext::login`] produced.
#[derive(Debug)]
pub struct LoginOutcome {
    pub session: SessionResult,
    /// Where the router went after login.
    pub navigation: NavigationOutcome,
    /// The background permission load for the new identity.
    pub permissions: JoinHandle<()>,
}

// ---------------------------------------------------------------------------
// AppContextBuilder
// ---------------------------------------------------------------------------

/// Builder for an [`AppContext`].
///
/// # Example
///
/// ```rust,ignore
/// let config = ClientConfig::load("portal.json")?;
/// let backend = HttpBackend::new(config.http())?;
/// let ctx = AppContextBuilder::new()
///     .config(config)
///     .evidence(&cookie_header)
///     .reloader(|| std::process::exit(0))
///     .build(backend);
/// ```
pub struct AppContextBuilder {
    config: ClientConfig,
    evidence: String,
    preferences: Option<Arc<dyn PreferenceStore>>,
    reloader: Option<Arc<dyn Reloader>>,
}

impl AppContextBuilder {
    /// Creates a builder with default settings and no session evidence.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            evidence: String::new(),
            preferences: None,
            reloader: None,
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Session evidence present at start-up, usually the cookie string.
    pub fn evidence(mut self, evidence: &str) -> Self {
        self.evidence = evidence.to_string();
        self
    }

    /// Overrides the store chosen from `config.preferences_path`.
    pub fn preferences(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(store);
        self
    }

    pub fn reloader(mut self, reloader: impl Reloader + 'static) -> Self {
        self.reloader = Some(Arc::new(reloader));
        self
    }

    /// Wires every component. Performs no I/O besides reading the stored
    /// locale; call [`AppContext::start`] to begin background work.
    pub fn build<B: Backend>(self, backend: B) -> AppContext<B> {
        let backend = Arc::new(backend);
        let session = SessionState::from_evidence(&self.evidence);
        tracing::info!(
            logged_in = session.is_logged_in(),
            identity = ?session.identity().map(Identity::reference),
            "session restored from evidence"
        );

        let permissions = Arc::new(PermissionStore::new(
            Arc::clone(&backend),
            session.user().cloned(),
            self.config.permissions(),
        ));
        let auth = Authenticator::new(Arc::clone(&backend), session, self.config.session())
            .with_invalidation(Arc::clone(&permissions) as Arc<dyn Invalidate>);
        let router = Router::new(
            NavigationGuard::new(self.config.routes.clone()),
            auth.subscribe(),
        );

        let preferences: Arc<dyn PreferenceStore> =
            match (self.preferences, &self.config.preferences_path) {
                (Some(store), _) => store,
                (None, Some(path)) => Arc::new(FilePreferences::new(path)),
                (None, None) => Arc::new(MemoryPreferences::new()),
            };
        let stored_locale = match preferences.get(PREFERRED_LOCALE_KEY) {
            Ok(locale) => locale,
            Err(e) => {
                tracing::warn!(error = %e, "stored preferences unreadable");
                None
            }
        };
        let (locale, _) = watch::channel(stored_locale);

        let reloader: Arc<dyn Reloader> = match self.reloader {
            Some(reloader) => reloader,
            None => Arc::new(|| tracing::info!("application reset requested")),
        };

        AppContext {
            config: self.config,
            backend,
            auth,
            permissions,
            router,
            preferences,
            reloader,
            locale,
        }
    }
}

impl Default for AppContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// AppContext
// ---------------------------------------------------------------------------

/// The application-wide session lifecycle.
pub struct AppContext<B> {
    config: ClientConfig,
    backend: Arc<B>,
    auth: Authenticator<Arc<B>>,
    permissions: Arc<PermissionStore<Arc<B>>>,
    router: Router,
    preferences: Arc<dyn PreferenceStore>,
    reloader: Arc<dyn Reloader>,
    locale: watch::Sender<Option<String>>,
}

impl<B: Backend> AppContext<B> {
    /// Creates a new builder. `AppContextBuilder::new()` avoids naming `B`.
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn authenticator(&self) -> &Authenticator<Arc<B>> {
        &self.auth
    }

    pub fn permissions(&self) -> &PermissionStore<Arc<B>> {
        &self.permissions
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn session(&self) -> SessionState {
        self.auth.current()
    }

    pub fn is_logged_in(&self) -> bool {
        self.auth.is_logged_in()
    }

    /// Fail-closed capability check by wire name, for views.
    pub fn can(&self, capability: &str) -> bool {
        self.permissions.has_named(capability)
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.permissions.has(capability)
    }

    /// The locale in effect: the profile's once bootstrapped, the stored one
    /// before that.
    pub fn locale(&self) -> Option<String> {
        self.locale.borrow().clone()
    }

    pub fn subscribe_locale(&self) -> watch::Receiver<Option<String>> {
        self.locale.subscribe()
    }

    /// Begins background work for a restored session: spawns the permission
    /// load, then bootstraps the locale.
    ///
    /// Returns the permission load's handle, `None` when nobody is logged in.
    pub async fn start(&self) -> Option<JoinHandle<()>> {
        let load = self.auth.identity().filter(|i| !i.is_guest()).map(|identity| {
            self.spawn_permission_load(identity)
        });
        self.bootstrap_locale().await;
        load
    }

    /// Guarded navigation. See [`Router::navigate`].
    pub fn navigate(&self, href: &str) -> Result<NavigationOutcome, GatehouseError> {
        Ok(self.router.navigate(href)?)
    }

    /// Logs in, loads permissions in the background and resumes the path
    /// the visitor was sent to login from.
    ///
    /// # Errors
    /// [`GatehouseError::Session`] when the login failed; nothing changed.
    pub async fn login(&self, identity: &str, secret: &str) -> Result<LoginOutcome, GatehouseError> {
        let session = self.auth.login(identity, secret).await?;
        let permissions = self.spawn_permission_load(session.identity.clone());
        let navigation = self.router.after_login()?;
        Ok(LoginOutcome {
            session,
            navigation,
            permissions,
        })
    }

    /// Logs out, resets the application and re-guards the current view.
    ///
    /// Never fails because of the endpoint: a logout the backend did not
    /// confirm is logged, and local state is cleared either way.
    pub async fn logout(&self) -> Result<Option<NavigationOutcome>, GatehouseError> {
        if let Err(e) = self.auth.logout().await {
            tracing::warn!(error = %e, "continuing with local logout");
        }
        self.reloader.reload();
        Ok(self.router.revalidate()?)
    }

    /// Asks the backend who is logged in and adopts that identity's locale,
    /// persisting it for the next start.
    ///
    /// Failures are logged and leave the current locale in place.
    pub async fn bootstrap_locale(&self) -> Option<String> {
        let reference = self
            .quietly("current identity", self.backend.current_identity())
            .await
            .flatten()
            .filter(|r| !Identity::from_reference(r.as_str()).is_guest());
        let Some(reference) = reference else {
            return self.locale();
        };

        let profile = self.quietly("profile", self.backend.profile(&reference)).await;
        if let Some(locale) = profile.and_then(|p| p.preferred_locale) {
            if let Err(e) = self.preferences.set(PREFERRED_LOCALE_KEY, &locale) {
                tracing::warn!(error = %e, "could not persist locale");
            }
            tracing::info!(identity = %reference, locale = %locale, "locale bootstrapped");
            self.locale.send_replace(Some(locale));
        }
        self.locale()
    }

    fn spawn_permission_load(&self, identity: Identity) -> JoinHandle<()> {
        let store = Arc::clone(&self.permissions);
        tokio::spawn(async move {
            match store.load_with_retry(Some(&identity)).await {
                Ok(outcome) => tracing::debug!(%identity, ?outcome, "permission load finished"),
                Err(e) => tracing::warn!(%identity, error = %e, "permissions unavailable"),
            }
        })
    }

    /// Runs a best-effort endpoint call under the request timeout.
    async fn quietly<T>(
        &self,
        what: &'static str,
        call: impl Future<Output = Result<T, TransportError>>,
    ) -> Option<T> {
        match time::timeout(self.config.request_timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "{what} lookup failed");
                None
            }
            Err(_) => {
                tracing::warn!("{what} lookup timed out");
                None
            }
        }
    }
}
