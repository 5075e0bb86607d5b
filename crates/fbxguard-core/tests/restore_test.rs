#![allow(clippy::unwrap_used)]
// End-to-end restore, snapshot and connection lifecycle against a
// simulated appliance.

use std::path::Path;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fbxguard_api::ApiClient;
use fbxguard_core::{
    AppIdentity, Appliance, ApplianceConfig, ApprovalPolicy, ChangeLog, ClassPlan, ClassResult,
    CoreError, RestorePlan, ResourceKind, TlsVerification, restore, snapshot,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn mount_version(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api_version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "api_version": "4.0",
            "api_base_url": "/api/"
        })))
        .mount(server)
        .await;
}

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    mount_version(&server).await;
    let client = ApiClient::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap())
        .await
        .unwrap();
    (server, client)
}

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "result": result }))
}

async fn mount_list(server: &MockServer, route: &str, result: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ok(result))
        .mount(server)
        .await;
}

fn plan(dir: &Path) -> RestorePlan {
    RestorePlan {
        redirections: ClassPlan::new(dir.join("redirections.yaml")).with_sentinel("22/tcp"),
        leases: ClassPlan::new(dir.join("leases.yaml")).with_sentinel("mynas"),
        incoming: ClassPlan::new(dir.join("incoming.yaml")),
    }
}

const REDIRECTIONS_DOC: &str = r#"
22/tcp:
  enabled: true
  ip_proto: tcp
  wan_port_start: 22
  wan_port_end: 22
  lan_port: 22
  lan_ip: 192.168.1.5
80/tcp:
  enabled: true
  ip_proto: tcp
  wan_port_start: 80
  wan_port_end: 80
  lan_port: 80
  lan_ip: 192.168.1.5
"#;

const LEASES_DOC: &str = r#"
mynas:
  mac: "00:11:22:33:44:55"
  ip: 192.168.1.5
"#;

const INCOMING_DOC: &str = r#"
ftp:
  enabled: false
  in_port: 21
  readonly: false
  type: tcp
"#;

// ── Restore ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_restore_fills_only_missing_redirection() {
    let (server, client) = setup().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("redirections.yaml"), REDIRECTIONS_DOC).unwrap();
    std::fs::write(dir.path().join("leases.yaml"), LEASES_DOC).unwrap();
    std::fs::write(dir.path().join("incoming.yaml"), INCOMING_DOC).unwrap();

    // 80/tcp exists with a different LAN port; 22/tcp is gone.
    mount_list(
        &server,
        "/api/v4/fw/redir/",
        json!([{
            "id": 4, "enabled": true, "ip_proto": "tcp", "wan_port_start": 80,
            "wan_port_end": 80, "lan_port": 8080, "lan_ip": "192.168.1.5"
        }]),
    )
    .await;
    mount_list(
        &server,
        "/api/v4/dhcp/static_lease/",
        json!([{ "mac": "00:11:22:33:44:55", "ip": "192.168.1.5", "hostname": "mynas" }]),
    )
    .await;
    mount_list(
        &server,
        "/api/v4/fw/incoming/",
        json!([{
            "id": "ftp", "enabled": false, "in_port": 21, "readonly": false,
            "type": "tcp", "min_port": 1, "max_port": 65535
        }]),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/api/v4/fw/redir/"))
        .and(body_partial_json(json!({ "wan_port_start": 22, "ip_proto": "tcp" })))
        .respond_with(ok(json!({ "id": 5 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/fw/redir/"))
        .and(body_partial_json(json!({ "wan_port_start": 80 })))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/dhcp/static_lease/"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v4/fw/incoming/ftp"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let log = ChangeLog::new(dir.path().join("changes.log"));
    let summary = restore(&client, &plan(dir.path()), Some(&log)).await;

    assert_eq!(summary.changed_classes(), vec![ResourceKind::Redirections]);
    assert!(!summary.is_clean());

    match summary.get(ResourceKind::Redirections).unwrap() {
        ClassResult::Reconciled(outcome) => {
            assert_eq!(outcome.applied, vec!["22/tcp".to_string()]);
            assert!(outcome.report.discrepant.contains_key("80/tcp"));
        }
        other => panic!("expected Reconciled, got {other:?}"),
    }
    assert!(matches!(
        summary.get(ResourceKind::StaticLeases),
        Some(ClassResult::Skipped { sentinel }) if sentinel == "mynas"
    ));
    match summary.get(ResourceKind::IncomingPorts).unwrap() {
        ClassResult::Reconciled(outcome) => assert!(!outcome.changed),
        other => panic!("expected Reconciled, got {other:?}"),
    }

    let text = std::fs::read_to_string(log.path()).unwrap();
    assert!(text.contains("missing: 22/tcp"));
    assert!(text.contains("mismatch: 80/tcp"));
}

#[tokio::test]
async fn test_missing_document_fails_only_its_class() {
    let (server, client) = setup().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("redirections.yaml"), REDIRECTIONS_DOC).unwrap();
    std::fs::write(dir.path().join("incoming.yaml"), INCOMING_DOC).unwrap();

    mount_list(
        &server,
        "/api/v4/fw/redir/",
        json!([
            { "ip_proto": "tcp", "wan_port_start": 22, "wan_port_end": 22,
              "enabled": true, "lan_port": 22, "lan_ip": "192.168.1.5" }
        ]),
    )
    .await;
    mount_list(&server, "/api/v4/dhcp/static_lease/", json!([])).await;
    mount_list(
        &server,
        "/api/v4/fw/incoming/",
        json!([{ "id": "ftp", "enabled": true, "in_port": 21, "readonly": false, "type": "tcp" }]),
    )
    .await;

    let summary = restore(&client, &plan(dir.path()), None).await;

    let failures: Vec<_> = summary.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, ResourceKind::StaticLeases);
    assert!(matches!(failures[0].1, CoreError::ConfigSource { .. }));
    assert!(matches!(
        summary.get(ResourceKind::Redirections),
        Some(ClassResult::Skipped { .. })
    ));
    // Present live with other content: reported, not rewritten.
    match summary.get(ResourceKind::IncomingPorts).unwrap() {
        ClassResult::Reconciled(outcome) => {
            assert!(!outcome.changed);
            assert!(outcome.report.discrepant.contains_key("ftp"));
        }
        other => panic!("expected Reconciled, got {other:?}"),
    }
    assert!(!summary.is_clean());
}

#[tokio::test]
async fn test_missing_incoming_policy_is_updated_without_locked_fields() {
    let (server, client) = setup().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("redirections.yaml"), "").unwrap();
    std::fs::write(dir.path().join("leases.yaml"), "").unwrap();
    std::fs::write(
        dir.path().join("incoming.yaml"),
        "ftp:\n  enabled: true\n  in_port: 21\n  readonly: true\n  type: tcp\n",
    )
    .unwrap();

    mount_list(&server, "/api/v4/fw/redir/", json!([])).await;
    mount_list(&server, "/api/v4/dhcp/static_lease/", json!([])).await;
    mount_list(
        &server,
        "/api/v4/fw/incoming/",
        json!([{ "id": "http", "enabled": true, "in_port": 80, "readonly": true }]),
    )
    .await;
    Mock::given(method("PUT"))
        .and(path("/api/v4/fw/incoming/ftp"))
        .respond_with(ok(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let plan = RestorePlan {
        redirections: ClassPlan::new(dir.path().join("redirections.yaml")),
        leases: ClassPlan::new(dir.path().join("leases.yaml")),
        incoming: ClassPlan::new(dir.path().join("incoming.yaml")),
    };
    let summary = restore(&client, &plan, None).await;

    assert_eq!(summary.changed_classes(), vec![ResourceKind::IncomingPorts]);
    match summary.get(ResourceKind::IncomingPorts).unwrap() {
        ClassResult::Reconciled(outcome) => {
            assert_eq!(outcome.applied, vec!["ftp".to_string()]);
            assert_eq!(outcome.report.exceeding, vec!["http".to_string()]);
        }
        other => panic!("expected Reconciled, got {other:?}"),
    }

    let requests = server.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|r| r.url.path() == "/api/v4/fw/incoming/ftp")
        .unwrap();
    let body: serde_json::Value = put.body_json().unwrap();
    assert_eq!(body, json!({ "enabled": true, "type": "tcp" }));
}

#[tokio::test]
async fn test_redirection_under_wrong_key_is_not_restored() {
    let (server, client) = setup().await;
    let dir = tempfile::tempdir().unwrap();
    // Keyed 22/tcp but describes 2222/tcp.
    std::fs::write(
        dir.path().join("redirections.yaml"),
        "22/tcp:\n  ip_proto: tcp\n  wan_port_start: 2222\n  lan_ip: 192.168.1.5\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("leases.yaml"), LEASES_DOC).unwrap();
    std::fs::write(dir.path().join("incoming.yaml"), "").unwrap();

    mount_list(&server, "/api/v4/fw/redir/", json!([])).await;
    mount_list(
        &server,
        "/api/v4/dhcp/static_lease/",
        json!([{ "mac": "00:11:22:33:44:55", "ip": "192.168.1.5", "hostname": "mynas" }]),
    )
    .await;
    mount_list(&server, "/api/v4/fw/incoming/", json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/v4/fw/redir/"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let summary = restore(&client, &plan(dir.path()), None).await;

    match summary.get(ResourceKind::Redirections).unwrap() {
        ClassResult::Failed { outcome, error } => {
            assert!(outcome.is_none());
            assert!(matches!(error, CoreError::Document { .. }), "got {error:?}");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(summary.failures().count(), 1);
}

#[tokio::test]
async fn test_refused_write_keeps_partial_outcome() {
    let (server, client) = setup().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("redirections.yaml"), REDIRECTIONS_DOC).unwrap();
    std::fs::write(dir.path().join("leases.yaml"), "").unwrap();
    std::fs::write(dir.path().join("incoming.yaml"), "").unwrap();

    mount_list(&server, "/api/v4/fw/redir/", json!([])).await;
    mount_list(&server, "/api/v4/dhcp/static_lease/", json!([])).await;
    mount_list(&server, "/api/v4/fw/incoming/", json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/v4/fw/redir/"))
        .and(body_partial_json(json!({ "wan_port_start": 22 })))
        .respond_with(ok(json!({ "id": 5 })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/fw/redir/"))
        .and(body_partial_json(json!({ "wan_port_start": 80 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false, "error_code": "port_conflict", "msg": "port already used"
        })))
        .mount(&server)
        .await;

    let plan = RestorePlan {
        redirections: ClassPlan::new(dir.path().join("redirections.yaml")),
        leases: ClassPlan::new(dir.path().join("leases.yaml")),
        incoming: ClassPlan::new(dir.path().join("incoming.yaml")),
    };
    let summary = restore(&client, &plan, None).await;

    match summary.get(ResourceKind::Redirections).unwrap() {
        ClassResult::Failed {
            outcome: Some(outcome),
            error,
        } => {
            assert!(
                matches!(error, CoreError::Apply { key, .. } if key == "80/tcp"),
                "got {error:?}"
            );
            // BTreeMap order: "22/tcp" sorts before "80/tcp".
            assert_eq!(outcome.applied, vec!["22/tcp".to_string()]);
            assert_eq!(outcome.report.missing.len(), 2);
        }
        other => panic!("expected Failed with outcome, got {other:?}"),
    }
    assert_eq!(summary.changed_classes(), vec![ResourceKind::Redirections]);
}

// ── Snapshot ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_snapshot_then_restore_is_clean() {
    let (server, client) = setup().await;
    let dir = tempfile::tempdir().unwrap();

    mount_list(
        &server,
        "/api/v4/fw/redir/",
        json!([{
            "id": 1, "enabled": true, "ip_proto": "udp", "wan_port_start": 51820,
            "wan_port_end": 51820, "lan_port": 51820, "lan_ip": "192.168.1.6",
            "comment": "wireguard"
        }]),
    )
    .await;
    mount_list(
        &server,
        "/api/v4/dhcp/static_lease/",
        json!([{ "mac": "00:11:22:33:44:55", "ip": "192.168.1.5", "hostname": "mynas" }]),
    )
    .await;
    mount_list(
        &server,
        "/api/v4/fw/incoming/",
        json!([{
            "id": "http", "enabled": true, "in_port": 80, "readonly": true,
            "min_port": 1, "max_port": 65535
        }]),
    )
    .await;

    let plan = RestorePlan {
        redirections: ClassPlan::new(dir.path().join("redirections.yaml")),
        leases: ClassPlan::new(dir.path().join("leases.yaml")),
        incoming: ClassPlan::new(dir.path().join("incoming.yaml")),
    };
    let saved = snapshot(&client, &plan).await.unwrap();
    assert_eq!(
        saved.iter().map(|d| d.entries).collect::<Vec<_>>(),
        vec![1, 1, 1]
    );

    let incoming = std::fs::read_to_string(dir.path().join("incoming.yaml")).unwrap();
    assert!(!incoming.contains("min_port"));

    let summary = restore(&client, &plan, None).await;
    assert!(summary.is_clean(), "{summary:?}");
    for (_, result) in &summary.results {
        match result {
            ClassResult::Reconciled(outcome) => assert!(outcome.report.is_empty()),
            other => panic!("expected Reconciled, got {other:?}"),
        }
    }
}

// ── Appliance lifecycle ─────────────────────────────────────────────

#[tokio::test]
async fn test_oneshot_connects_and_always_logs_out() {
    let server = MockServer::start().await;
    mount_version(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v4/login/authorize/3"))
        .respond_with(ok(json!({ "status": "granted" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v4/login/"))
        .respond_with(ok(json!({ "challenge": "xyz" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/login/session/"))
        .respond_with(ok(json!({ "session_token": "sess" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/login/logout/"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let credentials = dir.path().join("app.json");
    std::fs::write(
        &credentials,
        json!({
            "app_id": "fr.example.guard",
            "app_token": "token",
            "track_id": 3
        })
        .to_string(),
    )
    .unwrap();

    let config = ApplianceConfig {
        url: Url::parse(&server.uri()).unwrap(),
        tls: TlsVerification::SystemDefaults,
        timeout: Duration::from_secs(5),
        identity: AppIdentity::default(),
        credentials_file: credentials,
        approval: ApprovalPolicy::default(),
    };

    let result: Result<(), CoreError> =
        Appliance::oneshot(&config, &CancellationToken::new(), |appliance| async move {
            assert!(appliance.client().has_session());
            Err(CoreError::Internal("boom".into()))
        })
        .await;

    assert!(matches!(result, Err(CoreError::Internal(_))));
}
