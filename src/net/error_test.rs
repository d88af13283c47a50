use super::*;

#[test]
fn classify_401_is_auth_rejected_with_detail() {
    let err = classify_status(401, r#"{"detail":"Incorrect email or password"}"#);
    assert_eq!(err, ApiError::AuthRejected { detail: Some("Incorrect email or password".to_owned()) });
    assert_eq!(err.error_code(), "E_AUTH_REJECTED");
}

#[test]
fn classify_400_is_validation() {
    let err = classify_status(400, r#"{"detail":"Email already registered"}"#);
    assert!(matches!(err, ApiError::Validation { status: 400, .. }));
    assert_eq!(err.detail(), Some("Email already registered"));
}

#[test]
fn classify_422_is_validation_without_body() {
    let err = classify_status(422, "");
    assert_eq!(err, ApiError::Validation { status: 422, detail: None });
}

#[test]
fn classify_500_is_server_and_retryable() {
    let err = classify_status(500, r#"{"detail":"Internal server error"}"#);
    assert!(matches!(err, ApiError::Server { status: Some(500), .. }));
    assert!(err.retryable());
    assert!(!err.requires_probe());
}

#[test]
fn classify_unexpected_redirect_is_server() {
    let err = classify_status(302, "<html>moved</html>");
    assert_eq!(err, ApiError::Server { status: Some(302), detail: None });
    assert!(!err.retryable());
}

#[test]
fn connectivity_requires_probe() {
    let err = ApiError::Connectivity { detail: "connection refused".to_owned() };
    assert!(err.requires_probe());
    assert!(err.retryable());
    assert_eq!(err.to_string(), "backend unreachable: connection refused");
}

#[test]
fn server_display_includes_status_when_known() {
    assert_eq!(ApiError::Server { status: Some(503), detail: None }.to_string(), "server error (status 503)");
    assert_eq!(ApiError::Server { status: None, detail: None }.to_string(), "server error");
}

#[test]
fn malformed_body_keeps_status() {
    let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err = ApiError::malformed_body(200, &parse_err);
    assert!(matches!(err, ApiError::Server { status: Some(200), detail: Some(_) }));
}

#[tokio::test]
async fn builder_failure_is_server_not_connectivity() {
    let err = reqwest::Client::new().get("not a url").send().await.unwrap_err();
    assert!(err.is_builder());
    let classified = ApiError::from_transport(&err);
    assert!(matches!(classified, ApiError::Server { status: None, detail: Some(_) }));
    assert!(!classified.requires_probe());
}

#[tokio::test]
async fn redirect_loop_is_server_not_connectivity() {
    let mut server = mockito::Server::new_async().await;
    let _loop = server.mock("GET", "/loop").with_status(302).with_header("location", "/loop").create_async().await;

    let err = reqwest::Client::new().get(format!("{}/loop", server.url())).send().await.unwrap_err();

    assert!(err.is_redirect());
    assert!(matches!(ApiError::from_transport(&err), ApiError::Server { .. }));
}
