use std::time::Instant;

use super::*;
use crate::config::ClientConfig;
use mockito::Server;

fn prober_for(url: &str) -> HealthProber {
    HealthProber::new(&ApiClient::new(&ClientConfig::with_base_url(url).unwrap()).unwrap())
}

#[test]
fn report_from_healthy_body_has_no_detail() {
    let report = report_from_body(r#"{"status":"healthy","timestamp":"2025-01-01T00:00:00"}"#);
    assert!(report.reachable);
    assert_eq!(report.detail, None);
    assert_eq!(report.status.as_deref(), Some("healthy"));
}

#[test]
fn report_from_degraded_body_explains_status() {
    let report = report_from_body(r#"{"status":"degraded","checks":{"drive_service":{"status":"available"}}}"#);
    assert!(report.reachable);
    assert_eq!(report.detail.as_deref(), Some("backend reports status degraded"));
    assert_eq!(report.service_flags.get("drive_service"), Some(&true));
}

#[test]
fn report_from_unparseable_body_is_still_reachable() {
    let report = report_from_body("OK");
    assert!(report.reachable);
    assert!(report.service_flags.is_empty());
}

#[tokio::test]
async fn probe_healthy_backend() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", HEALTH_PATH)
        .with_status(200)
        .with_body(r#"{"status":"healthy","checks":{"database":{"status":"connected"}}}"#)
        .expect(1)
        .create_async()
        .await;

    let report = prober_for(&server.url()).probe().await;

    mock.assert_async().await;
    assert!(report.reachable);
    assert_eq!(report.service_flags.get("database"), Some(&true));
}

#[tokio::test]
async fn probe_non_success_is_unreachable() {
    let mut server = Server::new_async().await;
    let _mock = server.mock("GET", HEALTH_PATH).with_status(503).create_async().await;

    let report = prober_for(&server.url()).probe().await;
    assert!(!report.reachable);
    assert_eq!(report.detail.as_deref(), Some("health check returned HTTP 503"));
}

#[tokio::test]
async fn probe_refused_connection_is_unreachable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let report = prober_for(&format!("http://{addr}")).probe().await;
    assert!(!report.reachable);
    assert!(report.detail.is_some_and(|d| !d.is_empty()));
}

#[tokio::test]
async fn probe_silent_host_times_out_within_bound() {
    // Accepts connections but never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _hold = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let prober = prober_for(&format!("http://{addr}")).with_timeout(Duration::from_millis(300));
    let started = Instant::now();
    let report = prober.probe().await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!report.reachable);
    assert_eq!(report.detail.as_deref(), Some("no response within 300ms"));
}

#[tokio::test]
async fn probe_is_repeatable() {
    let mut server = Server::new_async().await;
    let mock = server.mock("GET", HEALTH_PATH).with_status(200).with_body("{}").expect(2).create_async().await;

    let prober = prober_for(&server.url());
    assert!(prober.probe().await.reachable);
    assert!(prober.probe().await.reachable);
    mock.assert_async().await;
}
