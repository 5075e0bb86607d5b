//! Profile configuration for fbxguard.
//!
//! TOML profiles merged with `FBXGUARD_` environment variables, default
//! locations for the credential file and saved documents, and translation
//! to `fbxguard_core::ApplianceConfig` / `RestorePlan`. The CLI layers its
//! flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fbxguard_core::{
    AppIdentity, ApplianceConfig, ApprovalPolicy, ClassPlan, RestorePlan, TlsVerification,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    ProfileNotFound { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named appliance profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Pause between approval status polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Give up waiting for front-panel approval after this many seconds.
    /// Unset waits until the appliance itself times the request out.
    pub approval_timeout: Option<u64>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            poll_interval_ms: default_poll_interval_ms(),
            approval_timeout: None,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_poll_interval_ms() -> u64 {
    1000
}

/// A named appliance profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Appliance base URL (e.g., "https://mafreebox.freebox.fr").
    pub url: String,

    /// CA bundle the appliance certificate chains to.
    pub ca_cert: Option<PathBuf>,

    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// App credential file. Defaults to `<data dir>/<profile>/app_auth.json`.
    pub credentials_file: Option<PathBuf>,

    /// Application id, only needed for the first registration.
    pub app_id: Option<String>,
    pub app_name: Option<String>,
    pub app_version: Option<String>,
    pub device_name: Option<String>,

    /// Saved documents. Default to `<data dir>/<profile>/<class>.yaml`.
    pub redirections_file: Option<PathBuf>,
    pub leases_file: Option<PathBuf>,
    pub incoming_file: Option<PathBuf>,

    /// Redirection key whose presence means redirections survived, e.g. `22/tcp`.
    pub redirection_sentinel: Option<String>,
    /// Lease hostname whose presence means leases survived.
    pub lease_sentinel: Option<String>,

    /// Append-only drift log.
    pub change_log: Option<PathBuf>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "fbxguard", "fbxguard")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory holding per-profile state (credential, saved documents).
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

fn dirs_fallback(under_home: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(under_home);
    p.push("fbxguard");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the Config from `path` + environment. A missing file yields the
/// defaults.
///
/// Environment keys nest with `__`, e.g.
/// `FBXGUARD_PROFILES__HOME__URL`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FBXGUARD_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile selection ───────────────────────────────────────────────

impl Config {
    /// Name of the profile to use: `requested`, else `default_profile`,
    /// else `"default"`.
    pub fn profile_name<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }
}

// ── Translation to runtime config ───────────────────────────────────

/// Build an `ApplianceConfig` from a profile and the global defaults.
pub fn profile_to_appliance_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ApplianceConfig, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: '{}'", profile.url),
    })?;

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    if defaults.poll_interval_ms == 0 {
        return Err(ConfigError::Validation {
            field: "poll_interval_ms".into(),
            reason: "must be greater than zero".into(),
        });
    }

    Ok(ApplianceConfig {
        url,
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        identity: AppIdentity {
            app_id: profile.app_id.clone(),
            app_name: profile.app_name.clone().unwrap_or_else(|| "fbxguard".into()),
            app_version: profile
                .app_version
                .clone()
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").into()),
            device_name: profile
                .device_name
                .clone()
                .unwrap_or_else(|| "fbxguard".into()),
        },
        credentials_file: profile
            .credentials_file
            .clone()
            .unwrap_or_else(|| profile_dir(profile_name).join("app_auth.json")),
        approval: ApprovalPolicy {
            poll_interval: Duration::from_millis(defaults.poll_interval_ms),
            deadline: defaults.approval_timeout.map(Duration::from_secs),
        },
    })
}

/// Saved documents and sentinels for `restore` / `save`.
pub fn profile_restore_plan(profile: &Profile, profile_name: &str) -> RestorePlan {
    let dir = profile_dir(profile_name);
    let doc = |configured: &Option<PathBuf>, default: &str| {
        configured.clone().unwrap_or_else(|| dir.join(default))
    };

    let mut redirections = ClassPlan::new(doc(&profile.redirections_file, "redirections.yaml"));
    if let Some(ref key) = profile.redirection_sentinel {
        redirections = redirections.with_sentinel(key.clone());
    }
    let mut leases = ClassPlan::new(doc(&profile.leases_file, "leases.yaml"));
    if let Some(ref key) = profile.lease_sentinel {
        leases = leases.with_sentinel(key.clone());
    }

    RestorePlan {
        redirections,
        leases,
        incoming: ClassPlan::new(doc(&profile.incoming_file, "incoming.yaml")),
    }
}

fn profile_dir(profile_name: &str) -> PathBuf {
    data_dir().join(profile_name)
}
