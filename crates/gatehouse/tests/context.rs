//! End-to-end lifecycle tests: boot, login, navigation, logout.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gatehouse::prelude::*;
use gatehouse::{PREFERRED_LOCALE_KEY, PreferenceError};

// =========================================================================
// Fake backend
// =========================================================================

/// One user database answering all three endpoints.
#[derive(Default)]
struct FakeBackend {
    accounts: HashMap<String, String>,
    grants: HashMap<String, Vec<Capability>>,
    languages: HashMap<String, String>,
    logged_in: Mutex<Option<String>>,
    permissions_down: AtomicBool,
    logout_fails: AtomicBool,
    permission_calls: AtomicUsize,
}

impl FakeBackend {
    fn portal() -> Self {
        let mut fake = Self::default();
        fake.accounts.insert("alice@example.com".into(), "hunter2".into());
        fake.accounts.insert("bob@example.com".into(), "pw".into());
        fake.grants.insert(
            "alice@example.com".into(),
            vec![Capability::DeleteInvoice, Capability::ShowDrafts],
        );
        fake.grants
            .insert("bob@example.com".into(), vec![Capability::SubmitInvoice]);
        fake.languages.insert("alice@example.com".into(), "de".into());
        fake
    }
}

impl SessionEndpoint for FakeBackend {
    async fn login(&self, identity: &str, secret: &str) -> Result<LoginResponse, TransportError> {
        let ok = self.accounts.get(identity).is_some_and(|s| s == secret);
        if ok {
            *self.logged_in.lock().unwrap() = Some(identity.to_string());
        }
        Ok(LoginResponse {
            success: ok,
            message: Some(if ok { "Logged In" } else { "Invalid Login" }.into()),
            evidence: if ok {
                format!("sid=s; user_id={}", identity.replace('@', "%40"))
            } else {
                String::new()
            },
        })
    }

    async fn logout(&self) -> Result<(), TransportError> {
        *self.logged_in.lock().unwrap() = None;
        if self.logout_fails.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("connection reset".into()));
        }
        Ok(())
    }
}

impl PermissionEndpoint for FakeBackend {
    async fn get_permissions(&self, identity: &str) -> Result<PermissionSet, TransportError> {
        self.permission_calls.fetch_add(1, Ordering::SeqCst);
        if self.permissions_down.load(Ordering::SeqCst) {
            return Err(TransportError::Status {
                endpoint: "permissions",
                status: 500,
            });
        }
        let grants = self.grants.get(identity).cloned().unwrap_or_default();
        Ok(grants.into_iter().map(|c| (c, true)).collect())
    }
}

impl ProfileEndpoint for FakeBackend {
    async fn current_identity(&self) -> Result<Option<String>, TransportError> {
        Ok(self.logged_in.lock().unwrap().clone())
    }

    async fn profile(&self, identity: &str) -> Result<Profile, TransportError> {
        Ok(Profile {
            preferred_locale: self.languages.get(identity).cloned(),
            full_name: None,
        })
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.request_timeout = Duration::from_secs(2);
    config.retry = RetryConfig::disabled();
    config
}

fn context(backend: FakeBackend, evidence: &str) -> AppContext<FakeBackend> {
    AppContextBuilder::new()
        .config(config())
        .evidence(evidence)
        .preferences(Arc::new(MemoryPreferences::new()))
        .build(backend)
}

// =========================================================================
// Boot
// =========================================================================

#[tokio::test]
async fn test_boot_without_evidence_redirects_to_login_with_route() {
    let ctx = context(FakeBackend::portal(), "");

    assert!(ctx.start().await.is_none(), "no permission load for anonymous");
    let outcome = ctx.navigate("/invoice").unwrap();

    assert_eq!(outcome.location().href(), "/login?route=/invoice");
    assert!(!ctx.can("can_delete_invoice"));
}

#[tokio::test]
async fn test_boot_with_guest_evidence_is_logged_out() {
    let ctx = context(FakeBackend::portal(), "user_id=Guest; sid=Guest");

    assert!(!ctx.is_logged_in());
    assert!(ctx.start().await.is_none());
}

#[tokio::test]
async fn test_boot_with_evidence_loads_permissions_in_background() {
    let backend = FakeBackend::portal();
    *backend.logged_in.lock().unwrap() = Some("alice@example.com".into());
    let ctx = context(backend, "user_id=alice%40example.com; sid=s");

    assert!(ctx.is_logged_in());
    assert!(!ctx.can("can_delete_invoice"), "denied until loaded");

    // Navigation never waits on permissions.
    assert!(matches!(
        ctx.navigate("/invoice").unwrap(),
        NavigationOutcome::Arrived(_)
    ));

    let load = ctx.start().await.expect("a load for the restored user");
    load.await.unwrap();

    assert!(ctx.can("can_delete_invoice"));
    assert!(!ctx.can("can_submit_invoice"));
    assert_eq!(ctx.locale(), Some("de".to_string()));
}

#[tokio::test]
async fn test_boot_with_malformed_evidence_is_logged_out() {
    let ctx = context(FakeBackend::portal(), "user_id=alice%zz");

    assert!(!ctx.is_logged_in());
    assert_eq!(
        ctx.navigate("/").unwrap().location().href(),
        "/login?route=/"
    );
}

// =========================================================================
// Login
// =========================================================================

#[tokio::test]
async fn test_login_resumes_requested_route_and_loads_permissions() {
    let ctx = context(FakeBackend::portal(), "");
    ctx.navigate("/invoice").unwrap();

    let outcome = ctx.login("alice@example.com", "hunter2").await.unwrap();

    assert_eq!(outcome.session.identity.reference(), "alice@example.com");
    assert_eq!(
        outcome.navigation,
        NavigationOutcome::Arrived(Location::new("/invoice"))
    );
    outcome.permissions.await.unwrap();
    assert!(ctx.has(Capability::DeleteInvoice));
    assert!(ctx.has(Capability::ShowDrafts));
}

#[tokio::test]
async fn test_login_rejected_stays_on_login_page() {
    let ctx = context(FakeBackend::portal(), "");
    ctx.navigate("/invoice").unwrap();

    let result = ctx.login("alice@example.com", "wrong").await;

    assert!(matches!(
        result,
        Err(GatehouseError::Session(SessionError::LoginFailed(_)))
    ));
    assert!(!ctx.is_logged_in());
    assert_eq!(
        ctx.router().current().unwrap().href(),
        "/login?route=/invoice"
    );
}

#[tokio::test]
async fn test_login_with_permissions_down_still_logs_in_fail_closed() {
    let backend = FakeBackend::portal();
    backend.permissions_down.store(true, Ordering::SeqCst);
    let ctx = context(backend, "");

    let outcome = ctx.login("alice@example.com", "hunter2").await.unwrap();
    outcome.permissions.await.unwrap();

    assert!(ctx.is_logged_in());
    for capability in Capability::ALL {
        assert!(!ctx.has(capability));
    }
}

#[tokio::test]
async fn test_login_then_login_page_redirects_home() {
    let ctx = context(FakeBackend::portal(), "");
    ctx.login("bob@example.com", "pw").await.unwrap();

    assert_eq!(ctx.navigate("/login").unwrap().location().href(), "/");
}

// =========================================================================
// Logout
// =========================================================================

#[tokio::test]
async fn test_logout_clears_permissions_and_reloads() {
    let reloads = Arc::new(AtomicUsize::new(0));
    let ctx = AppContextBuilder::new()
        .config(config())
        .reloader({
            let reloads = Arc::clone(&reloads);
            move || {
                reloads.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build(FakeBackend::portal());
    ctx.navigate("/invoice").unwrap();
    let login = ctx.login("alice@example.com", "hunter2").await.unwrap();
    login.permissions.await.unwrap();
    assert!(ctx.has(Capability::DeleteInvoice));

    let outcome = ctx.logout().await.unwrap().unwrap();

    assert!(!ctx.is_logged_in());
    assert!(!ctx.has(Capability::DeleteInvoice));
    assert!(ctx.permissions().snapshot().set().is_empty());
    assert_eq!(reloads.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.location().href(), "/login?route=/invoice");
}

#[tokio::test]
async fn test_logout_transport_failure_still_logs_out() {
    let backend = FakeBackend::portal();
    backend.logout_fails.store(true, Ordering::SeqCst);
    let ctx = context(backend, "user_id=alice%40example.com");

    ctx.logout().await.unwrap();

    assert!(!ctx.is_logged_in());
    assert_eq!(ctx.session(), SessionState::anonymous());
}

#[tokio::test]
async fn test_switching_users_never_leaks_permissions() {
    let ctx = context(FakeBackend::portal(), "");
    let alice = ctx.login("alice@example.com", "hunter2").await.unwrap();
    alice.permissions.await.unwrap();
    ctx.logout().await.unwrap();

    let bob = ctx.login("bob@example.com", "pw").await.unwrap();
    assert!(!ctx.has(Capability::DeleteInvoice), "alice's set is gone before bob's loads");
    bob.permissions.await.unwrap();

    assert!(ctx.has(Capability::SubmitInvoice));
    assert!(!ctx.has(Capability::DeleteInvoice));
}

// =========================================================================
// Preferences
// =========================================================================

struct BrokenPreferences;

impl PreferenceStore for BrokenPreferences {
    fn get(&self, _key: &str) -> Result<Option<String>, PreferenceError> {
        Err(PreferenceError::Io {
            path: "/broken".into(),
            source: std::io::Error::other("disk on fire"),
        })
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), PreferenceError> {
        self.get(key).map(|_| ())
    }
}

#[tokio::test]
async fn test_stored_locale_is_used_until_profile_answers() {
    let prefs = Arc::new(MemoryPreferences::new());
    prefs.set(PREFERRED_LOCALE_KEY, "fr").unwrap();
    let ctx = AppContextBuilder::new()
        .config(config())
        .preferences(Arc::clone(&prefs) as Arc<dyn PreferenceStore>)
        .build(FakeBackend::portal());

    assert_eq!(ctx.locale(), Some("fr".into()));

    ctx.login("alice@example.com", "hunter2").await.unwrap();
    assert_eq!(ctx.bootstrap_locale().await, Some("de".into()));
    assert_eq!(prefs.get(PREFERRED_LOCALE_KEY).unwrap(), Some("de".into()));

    ctx.logout().await.unwrap();
    assert_eq!(
        prefs.get(PREFERRED_LOCALE_KEY).unwrap(),
        Some("de".into()),
        "logout keeps preferences"
    );
}

#[tokio::test]
async fn test_broken_preferences_degrade_silently() {
    let backend = FakeBackend::portal();
    *backend.logged_in.lock().unwrap() = Some("alice@example.com".into());
    let ctx = AppContextBuilder::new()
        .config(config())
        .evidence("user_id=alice%40example.com")
        .preferences(Arc::new(BrokenPreferences))
        .build(backend);

    assert_eq!(ctx.locale(), None);
    assert_eq!(ctx.bootstrap_locale().await, Some("de".into()));
}

#[tokio::test]
async fn test_config_from_json_drives_routes() {
    let config = ClientConfig::from_json(
        r#"{
            "request_timeout_ms": 1000,
            "routes": {
                "routes": [
                    { "path": "/app", "name": "App", "requires_auth": true },
                    { "path": "/signin", "name": "SignIn", "requires_auth": false }
                ],
                "login": "SignIn",
                "home": "App"
            }
        }"#,
    )
    .unwrap();
    let ctx = AppContextBuilder::new().config(config).build(FakeBackend::portal());

    assert_eq!(
        ctx.navigate("/app").unwrap().location().href(),
        "/signin?route=/app"
    );
    let outcome = ctx.login("bob@example.com", "pw").await.unwrap();
    assert_eq!(outcome.navigation.location().path(), "/app");
}
