//! Backend liveness probing.
//!
//! DESIGN
//! ======
//! `probe()` never fails: timeouts, refused connections and non-2xx responses
//! all become `HealthReport { reachable: false, detail: Some(..) }`. The prober
//! keeps no state between calls, so it can be retried freely. Caching the last
//! report is the session gate's job.

#[cfg(test)]
#[path = "health_test.rs"]
mod health_test;

use std::time::Duration;

use crate::net::api::{ApiClient, HEALTH_PATH};
use crate::net::error::ApiError;
use crate::net::types::{HealthPayload, HealthReport};

#[derive(Clone, Debug)]
pub struct HealthProber {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HealthProber {
    /// Prober for `api`'s backend, bounded by the configured health timeout.
    #[must_use]
    pub fn new(api: &ApiClient) -> Self {
        Self { http: api.http().clone(), url: api.endpoint(HEALTH_PATH), timeout: api.timeouts().health }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn probe(&self) -> HealthReport {
        let response = match self.http.get(&self.url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                let detail = describe_transport_failure(&ApiError::from_transport(&e), self.timeout);
                tracing::warn!(url = %self.url, %detail, "health probe failed");
                return HealthReport::unreachable(detail);
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %self.url, status = status.as_u16(), "health probe returned non-success status");
            return HealthReport::unreachable(format!("health check returned HTTP {}", status.as_u16()));
        }

        let body = response.text().await.unwrap_or_default();
        let report = report_from_body(&body);
        tracing::debug!(url = %self.url, status = ?report.status, "health probe succeeded");
        report
    }
}

fn describe_transport_failure(err: &ApiError, timeout: Duration) -> String {
    match err {
        ApiError::Connectivity { detail } if detail.starts_with("request timed out") => {
            format!("no response within {}ms", timeout.as_millis())
        }
        other => other.detail().map_or_else(|| other.to_string(), str::to_owned),
    }
}

/// Build a reachable report from a 2xx body. Unparseable bodies still count as reachable.
fn report_from_body(body: &str) -> HealthReport {
    let payload: HealthPayload = serde_json::from_str(body).unwrap_or_default();
    let detail = payload
        .status
        .as_deref()
        .filter(|status| *status != "healthy")
        .map(|status| format!("backend reports status {status}"));
    HealthReport { reachable: true, detail, service_flags: payload.service_flags(), status: payload.status }
}
