use gatehouse_protocol::ProtocolError;

/// Errors that can occur while talking to a backend endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request never produced a response (connect, TLS, timeout).
    #[cfg(feature = "http")]
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("{endpoint} returned status {status}")]
    Status { endpoint: &'static str, status: u16 },

    /// The response body did not match the expected payload.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The endpoint could not be reached for a reason other than HTTP,
    /// e.g. an in-process backend that is shut down.
    #[error("endpoint unavailable: {0}")]
    Unavailable(String),

    /// The backend was configured with an unusable base URL or header.
    #[error("invalid backend configuration: {0}")]
    Config(String),
}
