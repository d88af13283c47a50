use std::sync::Arc;

use mockito::{Matcher, Server, ServerGuard};

use super::*;
use crate::config::ClientConfig;
use crate::net::api::{HEALTH_PATH, LOGIN_PATH};
use crate::net::error::ApiError;
use crate::notify::test_helpers::RecordingNotifier;
use crate::notify::SESSION_EXPIRED_MESSAGE;
use crate::state::session::SessionState;
use crate::state::token::MemoryPersistence;

fn sample_session() -> TherapySession {
    TherapySession {
        session_no: "3".to_owned(),
        date: "2026-03-14".to_owned(),
        client_code: "U-001".to_owned(),
        therapist: "Ana Pérez".to_owned(),
        objective: "Stabilise sleep routine".to_owned(),
        objective_development: "Reviewed diary".to_owned(),
        exercises: "Breathing".to_owned(),
        progress: "Fewer night awakenings".to_owned(),
        closing: "Agreed next steps".to_owned(),
        therapist_signature: "AP".to_owned(),
        organization: "Fundación Violeta".to_owned(),
        ..TherapySession::default()
    }
}

fn gate_for(server: &ServerGuard) -> (SessionGate, Arc<RecordingNotifier>) {
    let notices = Arc::new(RecordingNotifier::default());
    let config = ClientConfig::with_base_url(&server.url()).unwrap();
    let gate = SessionGate::from_config(&config, Box::new(MemoryPersistence::default()), notices.clone()).unwrap();
    (gate, notices)
}

async fn logged_in(server: &mut ServerGuard) -> (SessionGate, Arc<RecordingNotifier>) {
    server
        .mock("GET", HEALTH_PATH)
        .with_status(200)
        .with_body(r#"{"status":"healthy"}"#)
        .create_async()
        .await;
    server
        .mock("POST", LOGIN_PATH)
        .with_status(200)
        .with_body(r#"{"access_token":"T1","user":{"nombre":"Ana","email":"a@b.org"}}"#)
        .create_async()
        .await;
    let (gate, notices) = gate_for(server);
    gate.login("a@b.org", "secret1").await.unwrap();
    (gate, notices)
}

// =============================================================================
// WIRE FORMAT
// =============================================================================

#[test]
fn session_serializes_with_wire_names() {
    let json = serde_json::to_value(sample_session()).unwrap();
    assert_eq!(json["sesion_no"], "3");
    assert_eq!(json["codigo_usuaria"], "U-001");
    assert_eq!(json["avances_proceso_terapeutico"], "Fewer night awakenings");
    assert_eq!(json["herramientas_entregadas"], "");
    assert!(json.get("_id").is_none());
    assert!(json.get("created_at").is_none());
}

#[test]
fn profile_defaults_case_status_to_active() {
    let profile: ClientProfile = serde_json::from_str(
        r#"{"_id":"p1","codigo_usuaria":"U-001","terapeuta_asignado":"Ana","fundacion":"Fundación Violeta"}"#,
    )
    .unwrap();
    assert_eq!(profile.case_status, "activo");
    assert_eq!(profile.id.as_deref(), Some("p1"));
    assert_eq!(ClientProfile::default().case_status, "activo");
}

#[test]
fn created_accepts_either_id_key() {
    let session: Created = serde_json::from_str(r#"{"message":"ok","session_id":"s1"}"#).unwrap();
    let profile: Created = serde_json::from_str(r#"{"message":"ok","profile_id":"p1"}"#).unwrap();
    assert_eq!(session.id, "s1");
    assert_eq!(profile.id, "p1");
}

// =============================================================================
// OPERATIONS
// =============================================================================

#[tokio::test]
async fn list_sessions_filters_by_client_code() {
    let mut server = Server::new_async().await;
    let (gate, _) = logged_in(&mut server).await;
    let mut record = serde_json::to_value(sample_session()).unwrap();
    record["_id"] = "s1".into();
    record["created_at"] = "2026-03-14T10:00:00".into();
    let mock = server
        .mock("GET", SESSIONS_PATH)
        .match_query(Matcher::UrlEncoded("codigo_usuaria".into(), "U-001".into()))
        .match_header("authorization", "Bearer T1")
        .with_status(200)
        .with_body(serde_json::json!({ "sessions": [record] }).to_string())
        .expect(1)
        .create_async()
        .await;

    let sessions = list_sessions(&gate, Some("U-001")).await.unwrap();

    mock.assert_async().await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id.as_deref(), Some("s1"));
    assert_eq!(sessions[0].created_at.as_deref(), Some("2026-03-14T10:00:00"));
}

#[tokio::test]
async fn get_missing_session_keeps_session_alive() {
    let mut server = Server::new_async().await;
    let (gate, notices) = logged_in(&mut server).await;
    let _missing = server
        .mock("GET", "/api/sessions/nope")
        .with_status(404)
        .with_body(r#"{"detail":"Session not found"}"#)
        .create_async()
        .await;

    let err = get_session(&gate, "nope").await.unwrap_err();

    assert!(matches!(err.api(), Some(ApiError::Validation { status: 404, .. })));
    assert!(gate.state().is_authenticated());
    assert_eq!(notices.count_containing("Session not found"), 1);
}

#[tokio::test]
async fn get_session_keeps_id_inside_sessions_path() {
    let mut server = Server::new_async().await;
    let (gate, _) = logged_in(&mut server).await;
    let me = server.mock("GET", "/api/auth/me").expect(0).create_async().await;
    let encoded = server
        .mock("GET", Matcher::Regex(r"^/api/sessions/\.\.%2Fauth%2Fme$".to_owned()))
        .with_status(404)
        .with_body(r#"{"detail":"Session not found"}"#)
        .expect(1)
        .create_async()
        .await;

    let err = get_session(&gate, "../auth/me").await.unwrap_err();

    me.assert_async().await;
    encoded.assert_async().await;
    assert!(matches!(err.api(), Some(ApiError::Validation { status: 404, .. })));
}

#[tokio::test]
async fn get_session_rejects_dot_id_without_request() {
    let mut server = Server::new_async().await;
    let (gate, _) = logged_in(&mut server).await;
    let list = server.mock("GET", SESSIONS_PATH).expect(0).create_async().await;

    let err = get_session(&gate, "..").await.unwrap_err();

    list.assert_async().await;
    assert!(matches!(err.api(), Some(ApiError::Validation { status: 400, .. })));
    assert!(gate.state().is_authenticated());
}

#[tokio::test]
async fn create_session_posts_wire_body() {
    let mut server = Server::new_async().await;
    let (gate, _) = logged_in(&mut server).await;
    let mock = server
        .mock("POST", SESSIONS_PATH)
        .match_header("authorization", "Bearer T1")
        .match_body(Matcher::PartialJson(serde_json::json!({ "sesion_no": "3", "codigo_usuaria": "U-001" })))
        .with_status(200)
        .with_body(r#"{"message":"Session created successfully","session_id":"s9"}"#)
        .expect(1)
        .create_async()
        .await;

    let created = create_session(&gate, &sample_session()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(created.id, "s9");
}

#[tokio::test]
async fn profiles_round_trip_through_backend() {
    let mut server = Server::new_async().await;
    let (gate, _) = logged_in(&mut server).await;
    let create = server
        .mock("POST", PROFILES_PATH)
        .match_body(Matcher::PartialJson(serde_json::json!({ "codigo_usuaria": "U-002", "estado_caso": "activo" })))
        .with_status(200)
        .with_body(r#"{"message":"Profile created successfully","profile_id":"p2"}"#)
        .create_async()
        .await;
    let list = server
        .mock("GET", PROFILES_PATH)
        .with_status(200)
        .with_body(r#"{"profiles":[{"_id":"p2","codigo_usuaria":"U-002","terapeuta_asignado":"Ana","fundacion":"F"}]}"#)
        .create_async()
        .await;

    let profile = ClientProfile {
        client_code: "U-002".to_owned(),
        assigned_therapist: "Ana".to_owned(),
        organization: "F".to_owned(),
        ..ClientProfile::default()
    };
    let created = create_profile(&gate, &profile).await.unwrap();
    let profiles = list_profiles(&gate).await.unwrap();

    create.assert_async().await;
    list.assert_async().await;
    assert_eq!(created.id, "p2");
    assert_eq!(profiles[0].client_code, "U-002");
}

#[tokio::test]
async fn records_require_a_credential() {
    let mut server = Server::new_async().await;
    let mock = server.mock("GET", PROFILES_PATH).expect(0).create_async().await;
    let (gate, _) = gate_for(&server);
    gate.bootstrap().await;

    let err = list_profiles(&gate).await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, SessionError::NotAuthenticated));
}

#[tokio::test]
async fn expired_credential_ends_session() {
    let mut server = Server::new_async().await;
    let (gate, notices) = logged_in(&mut server).await;
    let _rejected = server.mock("GET", SESSIONS_PATH).with_status(401).create_async().await;

    list_sessions(&gate, None).await.unwrap_err();

    assert_eq!(gate.state(), SessionState::Unauthenticated);
    assert_eq!(notices.count_containing(SESSION_EXPIRED_MESSAGE), 1);
}

#[tokio::test]
async fn malformed_list_is_server_error() {
    let mut server = Server::new_async().await;
    let (gate, _) = logged_in(&mut server).await;
    let _garbage = server.mock("GET", SESSIONS_PATH).with_status(200).with_body("<html>").create_async().await;

    let err = list_sessions(&gate, None).await.unwrap_err();

    assert!(matches!(err.api(), Some(ApiError::Server { .. })));
    assert!(gate.state().is_authenticated());
}
