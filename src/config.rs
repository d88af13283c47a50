//! Client configuration: backend base URL and per-operation timeouts.
//!
//! DESIGN
//! ======
//! The base URL is the only environment-dependent setting. It is resolved once
//! at startup from `REGISTRO_BACKEND_URL`, then `REGISTRO_API_URL`, then
//! [`DEFAULT_BASE_URL`]. Timeouts are fixed defaults that embedders may override
//! in code through [`ClientConfig::with_timeouts`].

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";
pub const BASE_URL_ENV: &str = "REGISTRO_BACKEND_URL";
pub const BASE_URL_FALLBACK_ENV: &str = "REGISTRO_API_URL";

pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_BOOTSTRAP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced while building the client from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The base URL is not an absolute `http`/`https` URL.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Upper bounds for each kind of backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// `GET /api/health`.
    pub health: Duration,
    /// `POST /api/auth/login` and `POST /api/auth/register`.
    pub auth: Duration,
    /// `GET /api/auth/me` during bootstrap.
    pub bootstrap: Duration,
    /// Every other authenticated call.
    pub request: Duration,
    /// TCP connect phase, shared by all calls.
    pub connect: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            health: Duration::from_secs(DEFAULT_HEALTH_TIMEOUT_SECS),
            auth: Duration::from_secs(DEFAULT_AUTH_TIMEOUT_SECS),
            bootstrap: Duration::from_secs(DEFAULT_BOOTSTRAP_TIMEOUT_SECS),
            request: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

// =============================================================================
// CLIENT CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeouts: Timeouts,
}

impl ClientConfig {
    /// Build config from the environment.
    ///
    /// Optional:
    /// - `REGISTRO_BACKEND_URL`: backend base URL
    /// - `REGISTRO_API_URL`: consulted when `REGISTRO_BACKEND_URL` is unset
    ///
    /// Falls back to [`DEFAULT_BASE_URL`] when neither is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the resolved URL is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let primary = std::env::var(BASE_URL_ENV).ok();
        let secondary = std::env::var(BASE_URL_FALLBACK_ENV).ok();
        let base_url = resolve_base_url(primary.as_deref(), secondary.as_deref())?;
        Ok(Self { base_url, timeouts: Timeouts::default() })
    }

    /// Build config for an explicit base URL with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if `raw` is malformed.
    pub fn with_base_url(raw: &str) -> Result<Self, ConfigError> {
        Ok(Self { base_url: normalize_base_url(raw)?, timeouts: Timeouts::default() })
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Construct the shared HTTP client for this config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientBuild`] if the TLS backend fails to initialize.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        reqwest::Client::builder()
            .connect_timeout(self.timeouts.connect)
            .build()
            .map_err(|e| ConfigError::HttpClientBuild(e.to_string()))
    }
}

/// Pick the first non-blank candidate, falling back to [`DEFAULT_BASE_URL`].
fn resolve_base_url(primary: Option<&str>, secondary: Option<&str>) -> Result<String, ConfigError> {
    let raw = [primary, secondary]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(DEFAULT_BASE_URL);
    normalize_base_url(raw)
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| ConfigError::InvalidBaseUrl { url: raw.to_owned(), reason };

    let parsed = reqwest::Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{other}'"))),
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_owned()));
    }
    Ok(trimmed.to_owned())
}
