//! Gateway failure type.

use thiserror::Error;

/// A model gateway call failed before producing a usable turn.
///
/// `status` is the HTTP status when the provider answered with an error,
/// `None` for transport failures, timeouts, and unparseable bodies.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("model gateway error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
pub struct GatewayError {
    pub status: Option<u16>,
    pub message: String,
}

impl GatewayError {
    /// Error with an HTTP status code from the provider.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Transport-level error (connect, timeout, decode).
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Whether the provider rejected the call for rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        self.status == Some(429)
    }
}
