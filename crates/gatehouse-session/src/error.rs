//! Error types for the session layer.

/// Malformed session evidence.
///
/// Never escapes [`SessionState::from_evidence`](crate::SessionState::from_evidence):
/// the caller gets a logged-out state and the error is logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionParseError {
    /// A pair had no `=` between key and value.
    #[error("evidence pair {0:?} has no '=' separator")]
    MissingSeparator(String),

    /// A pair started with `=`.
    #[error("evidence pair {0:?} has an empty key")]
    EmptyKey(String),

    /// A value contained a broken percent escape or decoded to invalid UTF-8.
    #[error("value of {key:?} is not valid percent-encoding")]
    InvalidEncoding { key: String },
}

/// Errors from login and logout.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backend rejected the credentials, or the endpoint failed.
    /// Prior session state is unchanged.
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// A logout was issued while this login was in flight; the login
    /// result was discarded.
    #[error("login superseded by logout")]
    LoginSuperseded,

    /// The endpoint did not answer within the configured timeout.
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// The logout notification failed. Local state was cleared anyway.
    #[error("logout transport failed: {0}")]
    LogoutTransportFailed(String),
}
