// ── Runtime connection configuration ──
//
// Describes how to reach and authenticate with one appliance. Built by
// the CLI from a profile; core never reads config files.

use std::path::PathBuf;
use std::time::Duration;

use fbxguard_api::{AppIdentity, ApprovalPolicy};
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// The appliance's CA bundle.
    CustomCa(PathBuf),
    /// Skip verification.
    DangerAcceptInvalid,
}

/// Configuration for connecting to a single appliance.
#[derive(Debug, Clone)]
pub struct ApplianceConfig {
    /// Appliance root URL, e.g. `https://xxxx.fbxos.fr:4242`.
    pub url: Url,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Identity declared when registering a new application.
    pub identity: AppIdentity,
    /// Where the app credential is persisted.
    pub credentials_file: PathBuf,
    pub approval: ApprovalPolicy,
}
