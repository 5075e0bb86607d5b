// Appliance HTTP client
//
// Wraps `reqwest::Client` with API-root path resolution, session token
// injection and envelope unwrapping. Endpoint groups (login, firewall,
// DHCP, LAN browser, system) are inherent methods in separate files to
// keep this module focused on transport mechanics.

use std::collections::BTreeMap;
use std::sync::RwLock;

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::{ApiVersion, Envelope};
use crate::transport::TransportConfig;

/// Header carrying the session token on authenticated calls.
pub const SESSION_HEADER: &str = "X-Fbx-App-Auth";

/// Unauthenticated discovery endpoint, relative to the appliance root.
const API_VERSION_PATH: &str = "/api_version";

/// Token and permissions of the open session.
#[derive(Default)]
struct SessionSlot {
    token: Option<SecretString>,
    permissions: BTreeMap<String, bool>,
}

/// Raw HTTP client for the appliance control API.
///
/// Handles the `{ success, result, error_code, msg }` envelope and
/// resolves relative paths against the published API base path. All
/// methods return the unwrapped `result`; the caller never sees the
/// envelope. Calls are never retried here.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    version: ApiVersion,
    /// Shared-read, exclusive-write. Only the authenticator writes it.
    session: RwLock<SessionSlot>,
}

impl ApiClient {
    /// Build the HTTP client from `transport` and discover the API.
    ///
    /// `base_url` is the appliance root, e.g. `https://xxxx.fbxos.fr`.
    pub async fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, base_url).await
    }

    /// Discover the API using a pre-built `reqwest::Client`.
    pub async fn with_client(http: reqwest::Client, base_url: Url) -> Result<Self, Error> {
        let url = base_url.join(API_VERSION_PATH)?;
        debug!("discovering API at {}", url);
        let resp = http.get(url).send().await?;
        let value = Self::parse_response(API_VERSION_PATH, resp).await?;
        let version: ApiVersion = decode(API_VERSION_PATH, value)?;
        debug!(
            api_version = version.api_version.as_deref().unwrap_or("?"),
            api_base_url = %version.api_base_url,
            "API discovered"
        );
        Ok(Self::from_parts(http, base_url, version))
    }

    /// Assemble a client from an already known API version.
    pub fn from_parts(http: reqwest::Client, base_url: Url, version: ApiVersion) -> Self {
        Self {
            http,
            base_url,
            version,
            session: RwLock::new(SessionSlot::default()),
        }
    }

    /// The appliance root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// What `GET /api_version` reported.
    pub fn api_version(&self) -> &ApiVersion {
        &self.version
    }

    // ── Session slot ─────────────────────────────────────────────────

    /// Whether a session token is currently held.
    pub fn has_session(&self) -> bool {
        self.session
            .read()
            .expect("session lock poisoned")
            .token
            .is_some()
    }

    /// Permissions granted to the open session (empty when none).
    pub fn permissions(&self) -> BTreeMap<String, bool> {
        self.session
            .read()
            .expect("session lock poisoned")
            .permissions
            .clone()
    }

    pub(crate) fn set_session(&self, token: SecretString, permissions: BTreeMap<String, bool>) {
        debug!("storing session token");
        let mut slot = self.session.write().expect("session lock poisoned");
        slot.token = Some(token);
        slot.permissions = permissions;
    }

    pub(crate) fn clear_session(&self) {
        let mut slot = self.session.write().expect("session lock poisoned");
        if slot.token.take().is_some() {
            trace!("session token dropped");
        }
        slot.permissions.clear();
    }

    fn apply_session(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let slot = self.session.read().expect("session lock poisoned");
        match slot.token.as_ref() {
            Some(token) => builder.header(SESSION_HEADER, token.expose_secret()),
            None => builder,
        }
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Resolve an endpoint path.
    ///
    /// Paths starting with `/` are taken from the appliance root as-is;
    /// anything else lives under the published `api_base_url`, e.g.
    /// `v4/fw/redir/` becomes `https://host/api/v4/fw/redir/`.
    pub fn endpoint_url(&self, path: &str) -> Result<Url, Error> {
        if path.starts_with('/') {
            return Ok(self.base_url.join(path)?);
        }
        let root = self.version.api_base_url.trim_end_matches('/');
        let root = if root.starts_with('/') {
            root.to_owned()
        } else {
            format!("/{root}")
        };
        Ok(self.base_url.join(&format!("{root}/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a request and unwrap the envelope into `T`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<T, Error> {
        let url = self.endpoint_url(path)?;
        debug!("{} {}", method, url);

        let mut builder = self.apply_session(self.http.request(method, url));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await?;
        let value = Self::parse_response(path, resp).await?;
        decode(path, value)
    }

    /// Send a GET request and unwrap the envelope.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.call(Method::GET, path, None::<&()>).await
    }

    /// Send a POST request with an optional JSON body.
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<T, Error> {
        self.call(Method::POST, path, body).await
    }

    /// Send a PUT request with a JSON body.
    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        self.call(Method::PUT, path, Some(body)).await
    }

    /// Map HTTP status and envelope to a JSON value or an error.
    ///
    /// Bodies carrying a `success` key are envelopes; `result` is
    /// returned (JSON `null` when absent). Bodies without one are
    /// returned whole, which is how `/api_version` answers.
    async fn parse_response(path: &str, resp: reqwest::Response) -> Result<serde_json::Value, Error> {
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            // Error bodies usually still carry the envelope.
            let (code, message) = match serde_json::from_str::<Envelope>(&body) {
                Ok(env) => (env.error_code, env.msg.unwrap_or_default()),
                Err(_) => (None, body.chars().take(200).collect()),
            };
            return Err(Error::Http {
                path: path.to_owned(),
                status: status.as_u16(),
                code,
                message,
            });
        }

        let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })?;

        if value.get("success").is_none() {
            return Ok(value);
        }

        let envelope: Envelope = serde_json::from_value(value).map_err(|e| Error::Deserialization {
            message: format!("malformed envelope: {e}"),
            body: body.clone(),
        })?;

        if envelope.success {
            Ok(envelope.result.unwrap_or(serde_json::Value::Null))
        } else {
            Err(Error::Rejected {
                path: path.to_owned(),
                code: envelope.error_code.unwrap_or_else(|| "unknown".into()),
                message: envelope.msg.unwrap_or_default(),
            })
        }
    }
}

fn decode<T: DeserializeOwned>(path: &str, value: serde_json::Value) -> Result<T, Error> {
    T::deserialize(&value).map_err(|e| Error::Deserialization {
        message: format!("{path}: {e}"),
        body: value.to_string(),
    })
}
