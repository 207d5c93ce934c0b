//! Session types: the visitor's identity and whether it counts as logged in.

use std::time::Duration;

use gatehouse_protocol::Identity;

use crate::parse_evidence;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for login/logout behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on a single login or logout call to the endpoint.
    ///
    /// Default: 10 seconds.
    pub request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The visitor's current session.
///
/// ```text
///   Anonymous ──(login)──→ Authenticated(identity)
///       ↑                          │
///       └─────────(logout)─────────┘
/// ```
///
/// A guest identity is kept as an identity but never counts as logged in:
/// `is_logged_in() == identity.is_some_and(|i| !i.is_guest())` always holds,
/// because it is computed rather than stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    identity: Option<Identity>,
}

impl SessionState {
    /// No identity at all.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A session for `identity`. Passing a guest identity yields a state
    /// that is not logged in.
    pub fn with_identity(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    /// Derives the session from cookie-style evidence at boot.
    ///
    /// Never fails: malformed evidence is logged and yields
    /// [`anonymous`](Self::anonymous). No network access happens here.
    pub fn from_evidence(raw: &str) -> Self {
        match parse_evidence(raw) {
            Ok(evidence) => match evidence.identity_reference() {
                Some(reference) => Self::with_identity(Identity::from_reference(reference)),
                None => Self::anonymous(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "malformed session evidence, treating as logged out");
                Self::anonymous()
            }
        }
    }

    /// The identity, guest included.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// The identity only when it is a real (non-guest) user. This is the
    /// identity permissions and profiles are keyed by.
    pub fn user(&self) -> Option<&Identity> {
        self.identity.as_ref().filter(|i| !i.is_guest())
    }

    pub fn is_logged_in(&self) -> bool {
        self.user().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_evidence_guest_is_not_logged_in() {
        let state = SessionState::from_evidence("user_id=Guest");

        assert!(!state.is_logged_in());
        assert!(state.identity().is_some_and(Identity::is_guest));
        assert_eq!(state.user(), None);
    }

    #[test]
    fn test_from_evidence_user_is_logged_in() {
        let state = SessionState::from_evidence("user_id=alice%40example.com; sid=abc");

        assert!(state.is_logged_in());
        assert_eq!(
            state.identity().map(Identity::reference),
            Some("alice@example.com")
        );
    }

    #[test]
    fn test_from_evidence_without_identity_key_is_anonymous() {
        let state = SessionState::from_evidence("sid=abc; system_user=yes");
        assert_eq!(state, SessionState::anonymous());
    }

    #[test]
    fn test_from_evidence_empty_identity_is_anonymous() {
        let state = SessionState::from_evidence("user_id=; sid=abc");
        assert_eq!(state, SessionState::anonymous());
    }

    #[test]
    fn test_from_evidence_malformed_degrades_to_anonymous() {
        for raw in [
            "user_id=alice%zz",
            "user_id=alice; garbage",
            "=alice",
            "user_id=%E0%A4%A",
        ] {
            let state = SessionState::from_evidence(raw);
            assert!(!state.is_logged_in(), "input {raw:?}");
            assert_eq!(state.identity(), None, "input {raw:?}");
        }
    }

    #[test]
    fn test_from_evidence_duplicate_identity_last_wins() {
        let state = SessionState::from_evidence("user_id=alice; user_id=Guest");
        assert!(!state.is_logged_in());

        let state = SessionState::from_evidence("user_id=Guest; user_id=alice");
        assert!(state.is_logged_in());
    }

    #[test]
    fn test_logged_in_matches_identity_rule_for_many_inputs() {
        // is_logged_in must equal "identity present and not the sentinel".
        let cases = [
            ("", false),
            ("user_id=Guest", false),
            ("user_id=guest", true),
            ("user_id=bob", true),
            ("sid=1", false),
            ("user_id=%47uest", false),
            ("user_id=Guest%20", true),
        ];
        for (raw, expected) in cases {
            assert_eq!(
                SessionState::from_evidence(raw).is_logged_in(),
                expected,
                "input {raw:?}"
            );
        }
    }

    #[test]
    fn test_with_identity_guest_is_not_logged_in() {
        let state = SessionState::with_identity(Identity::guest());
        assert!(!state.is_logged_in());
    }
}
