//! Counseling records: therapy sessions and client profiles.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every call here goes through [`SessionGate::fetch_json`], so the bearer
//! credential is attached in one place and a 401 ends the session. Field names
//! are English in Rust and Spanish on the wire.

#[cfg(test)]
#[path = "records_test.rs"]
mod records_test;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::state::session::{SessionError, SessionGate};

pub const SESSIONS_PATH: &str = "/api/sessions";
pub const PROFILES_PATH: &str = "/api/profiles";

const DEFAULT_CASE_STATUS: &str = "activo";

// =============================================================================
// TYPES
// =============================================================================

/// One therapy session record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TherapySession {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "sesion_no")]
    pub session_no: String,
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "codigo_usuaria")]
    pub client_code: String,
    #[serde(rename = "terapeuta")]
    pub therapist: String,
    #[serde(rename = "objetivo_sesion")]
    pub objective: String,
    #[serde(rename = "desarrollo_objetivo")]
    pub objective_development: String,
    #[serde(rename = "ejercicios_actividades")]
    pub exercises: String,
    #[serde(rename = "herramientas_entregadas", default)]
    pub tools_given: String,
    #[serde(rename = "avances_proceso_terapeutico")]
    pub progress: String,
    #[serde(rename = "cierre_sesion")]
    pub closing: String,
    #[serde(rename = "observaciones", default)]
    pub observations: String,
    #[serde(rename = "firma_terapeuta")]
    pub therapist_signature: String,
    #[serde(rename = "fundacion")]
    pub organization: String,
    /// Assigned by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Case profile for one client, keyed by her anonymised code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientProfile {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "codigo_usuaria")]
    pub client_code: String,
    #[serde(rename = "edad_aproximada", default, skip_serializing_if = "Option::is_none")]
    pub approximate_age: Option<String>,
    #[serde(rename = "situacion_general", default, skip_serializing_if = "Option::is_none")]
    pub general_situation: Option<String>,
    #[serde(rename = "tipo_violencia", default, skip_serializing_if = "Option::is_none")]
    pub violence_type: Option<String>,
    #[serde(rename = "estado_caso", default = "default_case_status")]
    pub case_status: String,
    #[serde(rename = "terapeuta_asignado")]
    pub assigned_therapist: String,
    #[serde(rename = "fundacion")]
    pub organization: String,
    #[serde(rename = "notas_generales", default, skip_serializing_if = "Option::is_none")]
    pub general_notes: Option<String>,
}

impl Default for ClientProfile {
    fn default() -> Self {
        Self {
            id: None,
            client_code: String::new(),
            approximate_age: None,
            general_situation: None,
            violence_type: None,
            case_status: default_case_status(),
            assigned_therapist: String::new(),
            organization: String::new(),
            general_notes: None,
        }
    }
}

fn default_case_status() -> String {
    DEFAULT_CASE_STATUS.to_owned()
}

#[derive(Debug, Deserialize)]
struct SessionList {
    #[serde(default)]
    sessions: Vec<TherapySession>,
}

#[derive(Debug, Deserialize)]
struct ProfileList {
    #[serde(default)]
    profiles: Vec<ClientProfile>,
}

/// Acknowledgement returned by the create endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    #[serde(default)]
    pub message: String,
    #[serde(alias = "session_id", alias = "profile_id")]
    pub id: String,
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// List session records, newest first, optionally for one client.
///
/// # Errors
///
/// Returns [`SessionError::NotAuthenticated`] without a credential, otherwise
/// the classified backend failure.
pub async fn list_sessions(gate: &SessionGate, client_code: Option<&str>) -> Result<Vec<TherapySession>, SessionError> {
    let mut request = gate.api().request(Method::GET, SESSIONS_PATH);
    if let Some(code) = client_code {
        request = request.query(&[("codigo_usuaria", code)]);
    }
    let list: SessionList = gate.fetch_json(request).await?;
    tracing::debug!(count = list.sessions.len(), client_code, "sessions listed");
    Ok(list.sessions)
}

/// Fetch one session record. A missing id is a `Validation` failure (404).
///
/// # Errors
///
/// See [`list_sessions`].
pub async fn get_session(gate: &SessionGate, id: &str) -> Result<TherapySession, SessionError> {
    let request = gate.api().request_item(Method::GET, SESSIONS_PATH, id)?;
    gate.fetch_json(request).await
}

/// # Errors
///
/// See [`list_sessions`].
pub async fn create_session(gate: &SessionGate, session: &TherapySession) -> Result<Created, SessionError> {
    let created: Created = gate.post_json(SESSIONS_PATH, session).await?;
    tracing::info!(id = %created.id, client_code = %session.client_code, "session record created");
    Ok(created)
}

/// # Errors
///
/// See [`list_sessions`].
pub async fn list_profiles(gate: &SessionGate) -> Result<Vec<ClientProfile>, SessionError> {
    let list: ProfileList = gate.get_json(PROFILES_PATH).await?;
    Ok(list.profiles)
}

/// # Errors
///
/// See [`list_sessions`].
pub async fn create_profile(gate: &SessionGate, profile: &ClientProfile) -> Result<Created, SessionError> {
    let created: Created = gate.post_json(PROFILES_PATH, profile).await?;
    tracing::info!(id = %created.id, client_code = %profile.client_code, "client profile created");
    Ok(created)
}
