//! Failure taxonomy for backend calls.
//!
//! DESIGN
//! ======
//! Every non-success outcome of an HTTP call is classified into exactly one
//! [`ApiError`] variant at the transport boundary. `Connectivity` is kept apart
//! from protocol errors because it means the health prober should be consulted
//! again before the next login attempt.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use super::types::ErrorBody;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No response arrived: connect failure, reset, or timeout.
    #[error("backend unreachable: {detail}")]
    Connectivity { detail: String },

    /// The backend rejected the credentials or the bearer token (401).
    #[error("authorization rejected")]
    AuthRejected { detail: Option<String> },

    /// Any other 4xx, e.g. duplicate email on register.
    #[error("request rejected with status {status}")]
    Validation { status: u16, detail: Option<String> },

    /// 5xx, an unexpected status, or a success body that could not be decoded.
    #[error("server error{}", status_suffix(.status))]
    Server { status: Option<u16>, detail: Option<String> },
}

impl ApiError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connectivity { .. } => "E_CONNECTIVITY",
            Self::AuthRejected { .. } => "E_AUTH_REJECTED",
            Self::Validation { .. } => "E_VALIDATION",
            Self::Server { .. } => "E_SERVER",
        }
    }

    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Connectivity { .. } | Self::Server { status: Some(500..=599), .. })
    }

    /// Whether the health prober should be re-consulted before the next attempt.
    #[must_use]
    pub fn requires_probe(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }

    /// Backend- or transport-supplied diagnostic text, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Connectivity { detail } => Some(detail),
            Self::AuthRejected { detail } | Self::Validation { detail, .. } | Self::Server { detail, .. } => {
                detail.as_deref()
            }
        }
    }

    /// Classify a transport-level failure from `reqwest`.
    #[must_use]
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Connectivity { detail: format!("request timed out: {err}") };
        }
        if err.is_connect() || err.is_request() {
            return Self::Connectivity { detail: err.to_string() };
        }
        // Decode, body, builder and redirect failures: a response problem, not reachability.
        Self::Server { status: err.status().map(|s| s.as_u16()), detail: Some(err.to_string()) }
    }

    /// Success status with a body that did not match the expected shape.
    #[must_use]
    pub fn malformed_body(status: u16, err: &serde_json::Error) -> Self {
        Self::Server { status: Some(status), detail: Some(format!("malformed response body: {err}")) }
    }
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

/// Classify a non-success HTTP status together with its raw body.
#[must_use]
pub fn classify_status(status: u16, body: &str) -> ApiError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message());
    match status {
        401 => ApiError::AuthRejected { detail },
        400..=499 => ApiError::Validation { status, detail },
        _ => ApiError::Server { status: Some(status), detail },
    }
}
