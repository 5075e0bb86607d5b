// ── Appliance connection ──
//
// Owns one client/authenticator pair for the lifetime of a connection:
// discover the API, run the authorization handshake, hand the
// authenticated client out, and log out at the end.

use std::future::Future;
use std::sync::Arc;

use fbxguard_api::transport::{TlsMode, TransportConfig};
use fbxguard_api::{ApiClient, Authenticator, CredentialStore};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{ApplianceConfig, TlsVerification};
use crate::error::CoreError;

/// An authenticated connection to one appliance.
///
/// Cheaply cloneable; clones share the session.
#[derive(Clone)]
pub struct Appliance {
    inner: Arc<ApplianceInner>,
}

struct ApplianceInner {
    client: ApiClient,
    auth: Mutex<Authenticator>,
}

impl Appliance {
    /// Discover the API and authenticate.
    ///
    /// On first use this registers the application and blocks until the
    /// request is approved on the appliance, `cancel` fires, or the
    /// approval deadline passes.
    pub async fn connect(
        config: &ApplianceConfig,
        cancel: &CancellationToken,
    ) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: tls_mode(&config.tls),
            timeout: config.timeout,
        };
        info!(url = %config.url, "connecting to appliance");
        let client = ApiClient::new(config.url.clone(), &transport).await?;

        let store = CredentialStore::new(&config.credentials_file);
        let mut auth =
            Authenticator::new(config.identity.clone(), store).with_policy(config.approval);
        auth.connect(&client, cancel).await?;

        Ok(Self {
            inner: Arc::new(ApplianceInner {
                client,
                auth: Mutex::new(auth),
            }),
        })
    }

    /// Log out. Failures are logged and ignored; safe to call twice.
    pub async fn disconnect(&self) {
        let mut auth = self.inner.auth.lock().await;
        auth.disconnect(&self.inner.client).await;
        debug!("disconnected");
    }

    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    /// Connect, run `f`, disconnect whatever `f` returned.
    ///
    /// `cancel` also aborts `f`.
    pub async fn oneshot<F, Fut, T, E>(
        config: &ApplianceConfig,
        cancel: &CancellationToken,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(Appliance) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CoreError>,
    {
        let appliance = Self::connect(config, cancel).await?;
        let result = tokio::select! {
            result = f(appliance.clone()) => result,
            () = cancel.cancelled() => Err(CoreError::Cancelled.into()),
        };
        appliance.disconnect().await;
        result
    }
}

fn tls_mode(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
