// App authorization and session handshake
//
// An application is registered once (the user approves it on the
// appliance's front panel) and receives a long-lived app token. Each run
// then answers a server challenge with HMAC-SHA1(app_token, challenge) to
// obtain a short-lived session token.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::Sha1;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::error::{AuthError, Error};
use crate::models::ApprovalStatus;

// ── Identity & credential ────────────────────────────────────────────

/// Identity the application declares when asking for authorization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentity {
    /// Required for a fresh registration, unused once a credential exists.
    pub app_id: Option<String>,
    pub app_name: String,
    pub app_version: String,
    pub device_name: String,
}

/// Long-lived credential obtained through front-panel approval.
///
/// Never rotated: a new token only comes from a new registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppCredential {
    pub app_id: String,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(serialize_with = "expose_secret", deserialize_with = "secret_string")]
    pub app_token: SecretString,
    /// Handle of the authorization request, polled until approval.
    pub track_id: u64,
}

fn expose_secret<S: Serializer>(secret: &SecretString, ser: S) -> Result<S::Ok, S::Error> {
    ser.serialize_str(secret.expose_secret())
}

fn secret_string<'de, D: Deserializer<'de>>(de: D) -> Result<SecretString, D::Error> {
    String::deserialize(de).map(SecretString::from)
}

/// JSON file holding the [`AppCredential`].
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored credential, `None` when the file does not exist.
    pub fn load(&self) -> Result<Option<AppCredential>, Error> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.error(e)),
        };
        let credential = serde_json::from_str(&raw).map_err(|e| self.error(e))?;
        debug!(path = %self.path.display(), "loaded app credential");
        Ok(Some(credential))
    }

    /// Write the credential through a temporary sibling and rename it
    /// into place, readable by the owner only.
    pub fn save(&self, credential: &AppCredential) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }
        let json = serde_json::to_string_pretty(credential).map_err(|e| self.error(e))?;
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = open_private(&tmp).map_err(|e| self.error(e))?;
            file.write_all(json.as_bytes()).map_err(|e| self.error(e))?;
            file.sync_all().map_err(|e| self.error(e))?;
        }
        std::fs::rename(&tmp, &self.path).map_err(|e| self.error(e))?;
        debug!(path = %self.path.display(), "saved app credential");
        Ok(())
    }

    fn error(&self, reason: impl std::fmt::Display) -> Error {
        Error::CredentialStore {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::File::create(path)
}

// ── Challenge response ───────────────────────────────────────────────

/// Session password: hex HMAC-SHA1 keyed by the app token over the challenge.
pub fn session_password(app_token: &SecretString, challenge: &str) -> String {
    let mut mac = Hmac::<Sha1>::new_from_slice(app_token.expose_secret().as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(challenge.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

// ── State machine ────────────────────────────────────────────────────

/// Where the handshake currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum AuthState {
    Unregistered,
    AwaitingApproval,
    Challenged,
    Authenticated,
    Disconnected,
}

/// How long and how often to poll for front-panel approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalPolicy {
    pub poll_interval: Duration,
    /// Give up locally after this long. `None` waits until the appliance
    /// itself reports a timeout.
    pub deadline: Option<Duration>,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            deadline: None,
        }
    }
}

/// Drives one application through registration, approval and session
/// opening against a single [`ApiClient`].
///
/// The authenticator is the only writer of the client's session slot.
pub struct Authenticator {
    identity: AppIdentity,
    store: CredentialStore,
    policy: ApprovalPolicy,
    credential: Option<AppCredential>,
    state: AuthState,
}

impl Authenticator {
    pub fn new(identity: AppIdentity, store: CredentialStore) -> Self {
        Self {
            identity,
            store,
            policy: ApprovalPolicy::default(),
            credential: None,
            state: AuthState::Unregistered,
        }
    }

    pub fn with_policy(mut self, policy: ApprovalPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn credential(&self) -> Option<&AppCredential> {
        self.credential.as_ref()
    }

    /// Run the whole handshake: register (or reuse the stored credential),
    /// wait for approval, open the session.
    pub async fn connect(
        &mut self,
        client: &ApiClient,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        self.register(client).await?;
        self.wait_for_approval(client, cancel).await?;
        self.open_session(client).await
    }

    /// `Unregistered → AwaitingApproval`.
    ///
    /// Reuses the stored credential when there is one. Otherwise asks the
    /// appliance for a new app token and persists it before approval, so a
    /// restart can resume waiting on the same request.
    pub async fn register(&mut self, client: &ApiClient) -> Result<&AppCredential, Error> {
        let credential = match self.store.load()? {
            Some(stored) => {
                debug!(app_id = %stored.app_id, "reusing stored app credential");
                stored
            }
            None => {
                let app_id = self
                    .identity
                    .app_id
                    .clone()
                    .filter(|id| !id.is_empty())
                    .ok_or(AuthError::NoAppId)?;
                let grant = client.request_authorization(&app_id, &self.identity).await?;
                let credential = AppCredential {
                    app_id,
                    app_name: Some(self.identity.app_name.clone()),
                    app_version: Some(self.identity.app_version.clone()),
                    device_name: Some(self.identity.device_name.clone()),
                    app_token: SecretString::from(grant.app_token),
                    track_id: grant.track_id,
                };
                self.store.save(&credential)?;
                info!(
                    track_id = credential.track_id,
                    "authorization requested, approve it on the appliance"
                );
                credential
            }
        };
        self.state = AuthState::AwaitingApproval;
        Ok(self.credential.insert(credential))
    }

    /// `AwaitingApproval → Challenged`.
    ///
    /// Polls the authorization status every `poll_interval` while it is
    /// pending. Both the in-flight poll and the pause between polls are
    /// raced against `cancel` and the policy deadline; losing the race drops
    /// the request future.
    pub async fn wait_for_approval(
        &mut self,
        client: &ApiClient,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let track_id = self
            .credential
            .as_ref()
            .map(|c| c.track_id)
            .ok_or(AuthError::NoAppId)?;
        let started = Instant::now();
        let deadline = self.policy.deadline.map(|d| started + d);
        let expired = || AuthError::DeadlineExceeded {
            waited_secs: started.elapsed().as_secs(),
        };

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let poll = client.approval_status(track_id);
            let state = tokio::select! {
                () = cancel.cancelled() => return Err(AuthError::Cancelled.into()),
                () = sleep_until_opt(deadline) => return Err(expired().into()),
                state = poll => state?,
            };
            debug!(attempt, status = %state.status, "approval status");

            match state.status {
                ApprovalStatus::Granted => {
                    self.state = AuthState::Challenged;
                    return Ok(());
                }
                ApprovalStatus::Pending => {}
                ApprovalStatus::Timeout => return Err(AuthError::Timeout.into()),
                ApprovalStatus::Denied => return Err(AuthError::Denied.into()),
                ApprovalStatus::Unknown => {
                    warn!(track_id, "appliance does not know this app token");
                    return Err(AuthError::Denied.into());
                }
            }

            tokio::select! {
                () = cancel.cancelled() => return Err(AuthError::Cancelled.into()),
                () = sleep_until_opt(deadline) => return Err(expired().into()),
                () = tokio::time::sleep(self.policy.poll_interval) => {}
            }
        }
    }

    /// `Challenged → Authenticated`.
    ///
    /// Any failure leaves the client without a session token.
    pub async fn open_session(&mut self, client: &ApiClient) -> Result<(), Error> {
        let credential = self.credential.as_ref().ok_or(AuthError::NoAppId)?;
        client.clear_session();

        let challenge = client
            .login_challenge()
            .await
            .map_err(|e| AuthError::SessionRejected {
                message: format!("cannot fetch login challenge: {e}"),
            })?;
        let password = session_password(&credential.app_token, &challenge.challenge);

        let grant = client
            .open_session(&credential.app_id, &password)
            .await
            .map_err(|e| AuthError::SessionRejected {
                message: e.to_string(),
            })?;

        client.set_session(SecretString::from(grant.session_token), grant.permissions);
        self.state = AuthState::Authenticated;
        info!(app_id = %credential.app_id, "session opened");
        Ok(())
    }

    /// `Authenticated → Disconnected`.
    ///
    /// Best effort: the logout outcome is logged and discarded, and the
    /// local token is dropped regardless. Safe to call without a session.
    pub async fn disconnect(&mut self, client: &ApiClient) {
        if client.has_session() {
            if let Err(e) = client.logout().await {
                warn!(error = %e, "logout failed (non-fatal)");
            }
        }
        client.clear_session();
        self.state = AuthState::Disconnected;
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
