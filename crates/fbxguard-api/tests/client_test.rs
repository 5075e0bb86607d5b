#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` transport mechanics using wiremock.

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fbxguard_api::{ApiClient, Error};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api_version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uid": "23b86ec8091013d668829fe12791fdab",
            "device_name": "Freebox Server",
            "api_version": "4.0",
            "api_base_url": "/api/",
            "device_type": "FreeboxServer1,1"
        })))
        .mount(&server)
        .await;
    let client = ApiClient::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap())
        .await
        .unwrap();
    (server, client)
}

// ── Discovery ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_discovery_reads_api_base_url() {
    let (_server, client) = setup().await;

    assert_eq!(client.api_version().api_base_url, "/api/");
    assert_eq!(client.api_version().api_version.as_deref(), Some("4.0"));
    assert!(!client.has_session());
}

#[tokio::test]
async fn test_relative_paths_resolve_under_api_root() {
    let (server, client) = setup().await;

    let url = client.endpoint_url("v4/fw/redir/").unwrap();
    assert_eq!(url.as_str(), format!("{}/api/v4/fw/redir/", server.uri()));

    let root = client.endpoint_url("/api_version").unwrap();
    assert_eq!(root.as_str(), format!("{}/api_version", server.uri()));
}

#[tokio::test]
async fn test_discovery_failure_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api_version"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let result =
        ApiClient::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap()).await;

    assert!(
        matches!(result, Err(Error::Http { status: 404, .. })),
        "expected Http 404, got: {:?}",
        result.err()
    );
}

// ── Envelope handling ───────────────────────────────────────────────

#[tokio::test]
async fn test_success_envelope_is_unwrapped() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/system/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": { "firmware_version": "4.7.3", "uptime_val": 1234 }
        })))
        .mount(&server)
        .await;

    let info = client.get_system_info().await.unwrap();
    assert_eq!(info["firmware_version"], "4.7.3");
    assert!(info.get("success").is_none());
}

#[tokio::test]
async fn test_failure_envelope_maps_to_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/system/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error_code": "insufficient_rights",
            "msg": "Cette application n'est pas autorisée à accéder à cette fonction"
        })))
        .mount(&server)
        .await;

    let err = client.get_system_info().await.unwrap_err();
    assert_eq!(err.api_error_code(), Some("insufficient_rights"));
    assert!(!err.is_auth());
    assert!(matches!(err, Error::Rejected { .. }), "got: {err:?}");
}

#[tokio::test]
async fn test_http_error_keeps_envelope_code() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/system/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "success": false,
            "error_code": "auth_required",
            "msg": "Invalid session token, or no session token sent"
        })))
        .mount(&server)
        .await;

    let err = client.get_system_info().await.unwrap_err();
    assert!(err.is_auth());
    match err {
        Error::Http {
            status,
            code,
            message,
            ..
        } => {
            assert_eq!(status, 403);
            assert_eq!(code.as_deref(), Some("auth_required"));
            assert!(message.contains("session token"));
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_not_auth() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/system/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client.get_system_info().await.unwrap_err();
    assert!(matches!(err, Error::Http { status: 502, .. }), "got: {err:?}");
    assert!(!err.is_auth());
}

#[tokio::test]
async fn test_garbage_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/system/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client.get_system_info().await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }), "got: {err:?}");
}

// ── Session header ──────────────────────────────────────────────────

#[tokio::test]
async fn test_no_session_header_without_token() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/system/"))
        .and(header_exists("X-Fbx-App-Auth"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v4/system/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": true, "result": {} })),
        )
        .mount(&server)
        .await;

    client.get_system_info().await.unwrap();
}

#[tokio::test]
async fn test_session_header_sent_after_login() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": { "logged_in": false, "challenge": "abcdef" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/login/session/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": {
                "session_token": "tok-123",
                "challenge": "abcdef",
                "permissions": { "settings": true, "explorer": false }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v4/system/"))
        .and(header("X-Fbx-App-Auth", "tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": { "serial": "abc" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = fbxguard_api::CredentialStore::new(dir.path().join("app.json"));
    store
        .save(&fbxguard_api::AppCredential {
            app_id: "fr.example.guard".into(),
            app_name: None,
            app_version: None,
            device_name: None,
            app_token: "app-token".to_string().into(),
            track_id: 1,
        })
        .unwrap();

    let mut auth = fbxguard_api::Authenticator::new(fbxguard_api::AppIdentity::default(), store);
    auth.register(&client).await.unwrap();
    auth.open_session(&client).await.unwrap();

    assert!(client.has_session());
    assert_eq!(client.permissions().get("settings"), Some(&true));

    let info = client.get_system_info().await.unwrap();
    assert_eq!(info["serial"], "abc");
}
