//! Wire DTOs for the auth and health endpoints.
//!
//! DESIGN
//! ======
//! Field names are English in Rust and mapped onto the backend's Spanish wire
//! names with `serde(rename)`. Everything the backend may omit defaults, so a
//! partial `user` object (e.g. only `nombre` and `email`) still deserializes.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// ROLE
// =============================================================================

/// Professional role of a registered user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[serde(rename = "terapeuta")]
    Therapist,
    #[serde(rename = "psicologo")]
    Psychologist,
    #[serde(rename = "abogado")]
    Lawyer,
    Admin,
    /// Any role this client does not know about yet.
    #[serde(other)]
    Unknown,
}

impl Role {
    #[must_use]
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Therapist => "terapeuta",
            Self::Psychologist => "psicologo",
            Self::Lawyer => "abogado",
            Self::Admin => "admin",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "terapeuta" | "therapist" => Ok(Self::Therapist),
            "psicologo" | "psychologist" => Ok(Self::Psychologist),
            "abogado" | "lawyer" => Ok(Self::Lawyer),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role '{other}' (expected terapeuta, psicologo, abogado or admin)")),
        }
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

/// The authenticated user's profile as returned by login and `/api/auth/me`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(rename = "apellido", default)]
    pub surname: String,
    pub email: String,
    #[serde(rename = "fundacion", default)]
    pub organization: String,
    #[serde(rename = "rol", default)]
    pub role: Role,
}

impl Identity {
    /// Name used in greetings; falls back to the email when the name is blank.
    #[must_use]
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() { &self.email } else { name }
    }
}

// =============================================================================
// AUTH PAYLOADS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: Identity,
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

/// Account data submitted to `POST /api/auth/register`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegisterProfile {
    pub email: String,
    pub password: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "apellido")]
    pub surname: String,
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(rename = "fundacion")]
    pub organization: String,
}

/// Optional `{detail}` body attached to FastAPI error responses.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Flatten `detail` into one human-readable string.
    ///
    /// Strings pass through; validation lists (`[{ "msg": ... }]`) are joined
    /// with `"; "`. Anything else yields `None`.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
            serde_json::Value::Array(items) => {
                let parts: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                    .collect();
                if parts.is_empty() { None } else { Some(parts.join("; ")) }
            }
            _ => None,
        }
    }
}

// =============================================================================
// HEALTH
// =============================================================================

/// Outcome of one liveness probe. Recomputed on every probe, never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub reachable: bool,
    /// Human-readable diagnostic; always present when `reachable` is false.
    pub detail: Option<String>,
    /// Backend-reported status string (`healthy`, `degraded`) when available.
    pub status: Option<String>,
    /// Auxiliary integrations and their availability, e.g. `drive_service`.
    pub service_flags: BTreeMap<String, bool>,
}

impl HealthReport {
    #[must_use]
    pub fn unreachable(detail: impl Into<String>) -> Self {
        Self { reachable: false, detail: Some(detail.into()), ..Self::default() }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HealthPayload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub checks: BTreeMap<String, serde_json::Value>,
}

impl HealthPayload {
    /// Reduce the backend's `checks` object to boolean service flags.
    pub(crate) fn service_flags(&self) -> BTreeMap<String, bool> {
        let mut flags = BTreeMap::new();
        for (name, check) in &self.checks {
            match check {
                serde_json::Value::Object(fields) => {
                    if let Some(status) = fields.get("status").and_then(serde_json::Value::as_str) {
                        flags.insert(name.clone(), matches!(status, "connected" | "available" | "ok" | "healthy"));
                    } else {
                        for (key, value) in fields {
                            if let Some(flag) = value.as_bool() {
                                flags.insert(format!("{name}.{key}"), flag);
                            }
                        }
                    }
                }
                serde_json::Value::Bool(flag) => {
                    flags.insert(name.clone(), *flag);
                }
                _ => {}
            }
        }
        flags
    }
}
