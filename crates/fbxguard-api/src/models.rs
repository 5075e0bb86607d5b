// Freebox OS API response types
//
// Every authenticated endpoint wraps its payload in the `Envelope`. Entry
// types keep only the fields that matter for comparison; serde drops the
// rest on deserialization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Response Envelope ────────────────────────────────────────────────

/// Standard response envelope.
///
/// ```json
/// { "success": true, "result": { ... } }
/// { "success": false, "error_code": "auth_required", "msg": "..." }
/// ```
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

/// Live entries of one resource class, keyed by natural key.
pub type Entries<T> = BTreeMap<String, T>;

// ── API discovery ────────────────────────────────────────────────────

/// Response of the unauthenticated `GET /api_version` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiVersion {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    /// Root under which all versioned endpoints live, e.g. `/api/`.
    pub api_base_url: String,
    #[serde(default)]
    pub api_domain: Option<String>,
    #[serde(default)]
    pub https_available: Option<bool>,
    #[serde(default)]
    pub https_port: Option<u16>,
}

// ── Authorization & session ──────────────────────────────────────────

/// `POST login/authorize/` result.
#[derive(Debug, Deserialize)]
pub struct AuthorizeGrant {
    pub app_token: String,
    pub track_id: u64,
}

/// State of a pending app authorization on the appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalStatus {
    /// The app token is invalid or has been revoked.
    Unknown,
    /// Waiting for the user to press the front-panel button.
    Pending,
    Timeout,
    Granted,
    Denied,
}

/// `GET login/authorize/{track_id}` result.
#[derive(Debug, Deserialize)]
pub struct ApprovalState {
    pub status: ApprovalStatus,
    #[serde(default)]
    pub challenge: Option<String>,
}

/// `GET login/` result.
#[derive(Debug, Deserialize)]
pub struct LoginChallenge {
    #[serde(default)]
    pub logged_in: bool,
    pub challenge: String,
}

/// `POST login/session/` result.
#[derive(Debug, Deserialize)]
pub struct SessionGrant {
    pub session_token: String,
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub permissions: BTreeMap<String, bool>,
}

// ── Port redirection ─────────────────────────────────────────────────

/// WAN port redirection from `fw/redir/`.
///
/// Only the allow-listed fields are kept; server bookkeeping such as
/// `id` or `host` never reaches the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRedirection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lan_port: Option<u16>,
    pub wan_port_start: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wan_port_end: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lan_ip: Option<String>,
    /// `tcp` or `udp`.
    pub ip_proto: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_ip: Option<String>,
}

impl PortRedirection {
    /// Natural key: `"<wan_port_start>/<ip_proto>"`, e.g. `22/tcp`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.wan_port_start, self.ip_proto)
    }
}

// ── DHCP ─────────────────────────────────────────────────────────────

/// A DHCP lease reduced to what identifies it. Keyed by hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticLease {
    pub mac: String,
    pub ip: String,
}

/// Raw lease as returned by `dhcp/static_lease/` and `dhcp/dynamic_lease/`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawLease {
    pub hostname: String,
    pub mac: String,
    pub ip: String,
}

// ── Incoming ports ───────────────────────────────────────────────────

/// Fields the appliance owns on an incoming port policy.
const INCOMING_BOOKKEEPING: [&str; 3] = ["id", "min_port", "max_port"];

/// Incoming service port policy from `fw/incoming/`, keyed by its
/// server-assigned id.
///
/// The field set varies by service, so it is kept as a JSON map with the
/// bookkeeping fields (`id`, `min_port`, `max_port`) removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncomingPortPolicy {
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl IncomingPortPolicy {
    /// Build a policy from a raw API object, returning it with its id.
    pub(crate) fn from_raw(
        mut raw: serde_json::Map<String, serde_json::Value>,
    ) -> Option<(String, Self)> {
        let id = match raw.get("id")? {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        for field in INCOMING_BOOKKEEPING {
            raw.remove(field);
        }
        Some((id, Self { fields: raw }))
    }

    /// Whether the appliance marks this policy's port as fixed.
    pub fn is_readonly(&self) -> bool {
        self.fields
            .get("readonly")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// Fields an update must not carry for this policy.
    pub fn read_only_fields(&self) -> &'static [&'static str] {
        if self.is_readonly() { &["in_port"] } else { &[] }
    }

    /// Payload for an in-place update: every field except the `readonly`
    /// marker and the fields it protects.
    pub fn update_payload(&self) -> serde_json::Map<String, serde_json::Value> {
        let locked = self.read_only_fields();
        self.fields
            .iter()
            .filter(|(k, _)| k.as_str() != "readonly" && !locked.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

// ── LAN browser ──────────────────────────────────────────────────────

/// Raw host object from `lan/browser/{zone}/`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawLanHost {
    pub primary_name: String,
    #[serde(default)]
    pub reachable: bool,
    #[serde(default)]
    pub last_time_reachable: Option<i64>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub persistent: Option<bool>,
    #[serde(default)]
    pub l3connectivities: Vec<L3Connectivity>,
}

/// One layer-3 address record of a LAN host.
#[derive(Debug, Clone, Deserialize)]
pub struct L3Connectivity {
    pub addr: String,
    /// Address family: `ipv4` or `ipv6`.
    pub af: String,
    #[serde(default)]
    pub reachable: bool,
    #[serde(default)]
    pub last_time_reachable: i64,
}

/// A host seen on the LAN, with its most recently reachable IPv4.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkNode {
    pub name: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_time_reachable: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// Pick the address of the reachable IPv4 record with the greatest
/// last-reachable timestamp.
pub fn latest_reachable_ipv4(records: &[L3Connectivity]) -> Option<&str> {
    records
        .iter()
        .filter(|c| c.reachable && c.af == "ipv4")
        .max_by_key(|c| c.last_time_reachable)
        .map(|c| c.addr.as_str())
}

impl From<RawLanHost> for NetworkNode {
    fn from(raw: RawLanHost) -> Self {
        let ip = latest_reachable_ipv4(&raw.l3connectivities).map(str::to_owned);
        Self {
            name: raw.primary_name,
            reachable: raw.reachable,
            last_time_reachable: raw.last_time_reachable,
            active: raw.active,
            persistent: raw.persistent,
            ip,
        }
    }
}
