//! HTTP client error types.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for `PulseClient` operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Transport failures from `PulseClient`. The observer never produces
/// these itself; they come from the network and are passed through.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("HTTP handshake failed: {0}")]
    Handshake(#[source] hyper::Error),

    #[error("request failed: {0}")]
    Request(#[source] hyper::Error),

    #[error("failed to read response body: {0}")]
    Body(#[source] hyper::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(#[from] http::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}
