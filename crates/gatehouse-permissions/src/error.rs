//! Error types for the permission layer.

/// A permission load that did not produce a set.
///
/// These never propagate to the user: the store stays fail-closed and the
/// caller logs them.
#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    /// The endpoint failed or returned an unusable body.
    #[error("permission fetch for {identity} failed: {reason}")]
    FetchFailed { identity: String, reason: String },

    /// The endpoint did not answer within the configured timeout.
    #[error("permission fetch for {identity} timed out")]
    Timeout { identity: String },
}
