//! REST transport for the Registro backend.
//!
//! `ApiClient` is the HTTP boundary: it joins paths onto the configured base URL,
//! applies the per-operation timeout, sends, and turns every non-success into an
//! [`ApiError`]. It holds no credential. Authenticated calls receive the bearer
//! token from the caller, which keeps token attachment an explicit per-request
//! step.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures and non-2xx statuses are classified here and nowhere
//! else, so every caller sees the same taxonomy.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::error::{ApiError, classify_status};
use super::types::{Identity, LoginRequest, LoginResponse, RegisterProfile};
use crate::config::{ClientConfig, ConfigError, Timeouts};
use crate::state::token::Credential;

pub const HEALTH_PATH: &str = "/api/health";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";
pub const ME_PATH: &str = "/api/auth/me";

fn endpoint_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// `path` plus one percent-encoded segment; `/`, `.` and `..` cannot escape it.
fn item_url(base_url: &str, path: &str, segment: &str) -> Option<reqwest::Url> {
    if matches!(segment, "" | "." | "..") {
        return None;
    }
    let mut url = reqwest::Url::parse(&endpoint_url(base_url, path)).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(segment);
    Some(url)
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeouts: Timeouts,
}

impl ApiClient {
    /// Build a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientBuild`] if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let http = config.http_client()?;
        Ok(Self { http, base_url: config.base_url.clone(), timeouts: config.timeouts })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        endpoint_url(&self.base_url, path)
    }

    /// Start a request for `path` bounded by the default request timeout.
    #[must_use]
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request_with_timeout(method, path, self.timeouts.request)
    }

    /// Start a request for the resource `segment` under `path`, e.g. one record by id.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] when `segment` cannot be addressed under `path`.
    pub fn request_item(&self, method: Method, path: &str, segment: &str) -> Result<RequestBuilder, ApiError> {
        let url = item_url(&self.base_url, path, segment).ok_or_else(|| ApiError::Validation {
            status: 400,
            detail: Some(format!("cannot address '{segment}' under {path}")),
        })?;
        Ok(self.http.request(method, url).timeout(self.timeouts.request))
    }

    fn request_with_timeout(&self, method: Method, path: &str, timeout: Duration) -> RequestBuilder {
        self.http.request(method, self.endpoint(path)).timeout(timeout)
    }

    /// Send `request` and classify anything other than a 2xx response.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Connectivity`] when no response arrives, otherwise the
    /// variant matching the response status.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|e| ApiError::from_transport(&e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = code, url = %self.base_url, "backend returned non-success status");
        Err(classify_status(code, &body))
    }

    /// Exchange email and password for a bearer token via `POST /api/auth/login`.
    ///
    /// # Errors
    ///
    /// Returns the classified failure; a 401 means the credentials were wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let request = self
            .request_with_timeout(Method::POST, LOGIN_PATH, self.timeouts.auth)
            .json(&LoginRequest { email, password });
        let response = self.execute(request).await?;
        let login: LoginResponse = read_json(response).await?;
        if !login.token_type.eq_ignore_ascii_case("bearer") {
            return Err(ApiError::Server {
                status: None,
                detail: Some(format!("unsupported token type '{}'", login.token_type)),
            });
        }
        Ok(login)
    }

    /// Create an account via `POST /api/auth/register`. Does not authenticate.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for duplicate or invalid input.
    pub async fn register(&self, profile: &RegisterProfile) -> Result<(), ApiError> {
        let request = self
            .request_with_timeout(Method::POST, REGISTER_PATH, self.timeouts.auth)
            .json(profile);
        self.execute(request).await?;
        Ok(())
    }

    /// Resolve the identity behind `credential` via `GET /api/auth/me`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AuthRejected`] when the token is invalid or expired.
    pub async fn current_user(&self, credential: &Credential) -> Result<Identity, ApiError> {
        let request = credential.attach(self.request_with_timeout(Method::GET, ME_PATH, self.timeouts.bootstrap));
        let response = self.execute(request).await?;
        read_json(response).await
    }
}

/// Decode a success body as JSON.
///
/// # Errors
///
/// Returns [`ApiError::Server`] when the body is unreadable or has the wrong shape.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status().as_u16();
    let text = response.text().await.map_err(|e| ApiError::from_transport(&e))?;
    serde_json::from_str(&text).map_err(|e| ApiError::malformed_body(status, &e))
}
