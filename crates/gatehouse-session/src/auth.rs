//! Login and logout transitions.
//!
//! [`Authenticator`] is the single writer of [`SessionState`]. Everyone else
//! reads it, either synchronously through [`Authenticator::current`] or
//! reactively through a `watch` receiver from [`Authenticator::subscribe`].
//!
//! # Ordering rules
//!
//! - Login attempts are serialized: a second `login` waits for the first.
//! - Every registered [`Invalidate`] hook runs before a new identity is
//!   published, inside the same state update, so no reader can observe the
//!   new identity alongside the previous identity's cached data.
//! - `logout` bumps an epoch and clears local state before it awaits
//!   anything. A login that was in flight or queued when the epoch moved is
//!   discarded with [`SessionError::LoginSuperseded`]: logout wins.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use gatehouse_protocol::Identity;
use gatehouse_transport::SessionEndpoint;
use tokio::sync::{Mutex, watch};
use tokio::time;

use crate::{SessionConfig, SessionError, SessionState, parse_evidence};

/// Something cached per identity that must be dropped when the identity
/// changes.
///
/// Called synchronously while the session update is in progress. Must not
/// read the authenticator's state.
pub trait Invalidate: Send + Sync {
    /// `next` is the identity about to become current, `None` on logout.
    fn invalidate(&self, next: Option<&Identity>);
}

/// What a successful login hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    pub identity: Identity,
    /// Cookie-style evidence returned by the endpoint, if any.
    pub evidence: String,
}

/// Performs login/logout against a [`SessionEndpoint`] and owns the
/// resulting [`SessionState`].
pub struct Authenticator<S> {
    endpoint: S,
    config: SessionConfig,
    state: watch::Sender<SessionState>,
    hooks: Vec<Arc<dyn Invalidate>>,
    login_gate: Mutex<()>,
    epoch: AtomicU64,
}

impl<S: SessionEndpoint> Authenticator<S> {
    /// Creates an authenticator starting from `initial` (usually
    /// [`SessionState::from_evidence`]).
    pub fn new(endpoint: S, initial: SessionState, config: SessionConfig) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            endpoint,
            config,
            state,
            hooks: Vec::new(),
            login_gate: Mutex::new(()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Registers a hook run on every identity change.
    pub fn with_invalidation(mut self, hook: Arc<dyn Invalidate>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// A snapshot of the current session.
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.borrow().is_logged_in()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    /// A receiver that observes every login/logout.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Submits credentials and, on success, makes `identity` current.
    ///
    /// The committed identity is the `user_id` in the evidence the endpoint
    /// returned when there is one, otherwise the submitted reference.
    ///
    /// # Errors
    /// - [`SessionError::LoginFailed`]: rejected credentials or endpoint
    ///   failure. State is unchanged. Not retried.
    /// - [`SessionError::Timeout`]: no answer within `request_timeout`.
    /// - [`SessionError::LoginSuperseded`]: a logout started meanwhile.
    pub async fn login(&self, identity: &str, secret: &str) -> Result<SessionResult, SessionError> {
        // Read before queueing so a logout issued while waiting still wins.
        let epoch = self.epoch.load(Ordering::SeqCst);
        let _serial = self.login_gate.lock().await;
        tracing::debug!(identity, "login attempt");

        let response = match time::timeout(
            self.config.request_timeout,
            self.endpoint.login(identity, secret),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(identity, error = %e, "login request failed");
                return Err(SessionError::LoginFailed(e.to_string()));
            }
            Err(_) => {
                tracing::warn!(identity, "login request timed out");
                return Err(SessionError::Timeout("login"));
            }
        };

        if !response.success {
            let reason = response
                .message
                .unwrap_or_else(|| "credentials rejected".to_string());
            tracing::info!(identity, reason = %reason, "login rejected");
            return Err(SessionError::LoginFailed(reason));
        }

        let next = committed_identity(identity, &response.evidence);
        if next.is_guest() {
            return Err(SessionError::LoginFailed(
                "endpoint returned a guest session".to_string(),
            ));
        }

        let committed = self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            for hook in &self.hooks {
                hook.invalidate(Some(&next));
            }
            *state = SessionState::with_identity(next.clone());
            true
        });

        if !committed {
            tracing::info!(identity, "login discarded, logout issued while in flight");
            return Err(SessionError::LoginSuperseded);
        }

        tracing::info!(identity = %next, "logged in");
        Ok(SessionResult {
            identity: next,
            evidence: response.evidence,
        })
    }

    /// Ends the session.
    ///
    /// Local state is cleared and hooks invalidated before the endpoint is
    /// contacted, so the client never stays logged in while the request is
    /// pending, when it fails, or when this future is dropped.
    ///
    /// # Errors
    /// [`SessionError::LogoutTransportFailed`] when the endpoint failed or
    /// timed out. The session is already cleared when this is returned.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|state| {
            for hook in &self.hooks {
                hook.invalidate(None);
            }
            *state = SessionState::anonymous();
        });
        tracing::info!("local session cleared");

        match time::timeout(self.config.request_timeout, self.endpoint.logout()).await {
            Ok(Ok(())) => {
                tracing::info!("logged out");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "logout not confirmed by endpoint");
                Err(SessionError::LogoutTransportFailed(e.to_string()))
            }
            Err(_) => {
                tracing::warn!("logout request timed out");
                Err(SessionError::LogoutTransportFailed(format!(
                    "no answer within {:?}",
                    self.config.request_timeout
                )))
            }
        }
    }
}

fn committed_identity(submitted: &str, evidence: &str) -> Identity {
    match parse_evidence(evidence) {
        Ok(parsed) => match parsed.identity_reference() {
            Some(reference) => Identity::from_reference(reference),
            None => Identity::from_reference(submitted),
        },
        Err(e) => {
            tracing::debug!(error = %e, "login evidence unreadable, using submitted identity");
            Identity::from_reference(submitted)
        }
    }
}
