use super::*;

#[test]
fn resolve_defaults_when_nothing_set() {
    assert_eq!(resolve_base_url(None, None).unwrap(), DEFAULT_BASE_URL);
}

#[test]
fn resolve_prefers_primary_over_fallback() {
    let url = resolve_base_url(Some("https://api.example.org"), Some("http://other:9000")).unwrap();
    assert_eq!(url, "https://api.example.org");
}

#[test]
fn resolve_skips_blank_primary() {
    let url = resolve_base_url(Some("   "), Some("http://other:9000/")).unwrap();
    assert_eq!(url, "http://other:9000");
}

#[test]
fn normalize_trims_trailing_slashes() {
    assert_eq!(normalize_base_url("http://localhost:8001///").unwrap(), "http://localhost:8001");
}

#[test]
fn normalize_rejects_relative_url() {
    let err = normalize_base_url("/api").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
}

#[test]
fn normalize_rejects_non_http_scheme() {
    let err = normalize_base_url("ftp://files.example.org").unwrap_err().to_string();
    assert!(err.contains("unsupported scheme 'ftp'"));
}

#[test]
fn default_timeouts_match_documented_bounds() {
    let t = Timeouts::default();
    assert_eq!(t.health, Duration::from_secs(5));
    assert_eq!(t.auth, Duration::from_secs(15));
    assert_eq!(t.bootstrap, Duration::from_secs(10));
}

#[test]
fn with_timeouts_overrides_defaults() {
    let timeouts = Timeouts { health: Duration::from_millis(200), ..Timeouts::default() };
    let cfg = ClientConfig::with_base_url("http://127.0.0.1:1").unwrap().with_timeouts(timeouts);
    assert_eq!(cfg.timeouts.health, Duration::from_millis(200));
    assert_eq!(cfg.base_url, "http://127.0.0.1:1");
}

// Only this test touches the `REGISTRO_*` variables.
#[test]
fn from_env_uses_fallback_variable() {
    unsafe {
        std::env::remove_var(BASE_URL_ENV);
        std::env::set_var(BASE_URL_FALLBACK_ENV, "http://fallback.test:8080/");
    }

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.base_url, "http://fallback.test:8080");
    assert_eq!(cfg.timeouts, Timeouts::default());

    unsafe { std::env::remove_var(BASE_URL_FALLBACK_ENV) };
}
