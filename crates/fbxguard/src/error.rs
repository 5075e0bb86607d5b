//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help
//! text, and each error to a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use fbxguard_config::ConfigError;
use fbxguard_core::CoreError;

pub mod exit_code {
    /// Also used when `restore` had to change something.
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the appliance at {url}")]
    #[diagnostic(
        code(fbxguard::connection_failed),
        help(
            "Check that the Freebox is reachable from this host: {reason}\n\
             A self-signed certificate needs --ca-cert or --insecure (-k)."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(fbxguard::timeout),
        help("Increase the timeout with --timeout or check the appliance.")
    )]
    Timeout,

    // ── Authorization ────────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(fbxguard::auth_failed),
        help(
            "The stored app token may have been revoked.\n\
             Delete the credential file and approve fbxguard again."
        )
    )]
    AuthFailed { message: String },

    #[error("fbxguard was not approved: {message}")]
    #[diagnostic(
        code(fbxguard::not_approved),
        help("Run the command again and accept the request on the Freebox front panel.")
    )]
    NotApproved { message: String },

    #[error("Missing permission: {message}")]
    #[diagnostic(
        code(fbxguard::permission),
        help(
            "Grant the application the needed rights in Freebox OS\n\
             (Parameters > Access management > Applications)."
        )
    )]
    PermissionDenied { message: String },

    #[error("Interrupted")]
    #[diagnostic(code(fbxguard::interrupted))]
    Interrupted,

    // ── Appliance ────────────────────────────────────────────────────
    #[error("API error ({code}): {message}")]
    #[diagnostic(code(fbxguard::api_error))]
    ApiError { code: String, message: String },

    // ── Restore ──────────────────────────────────────────────────────
    #[error("No saved {kind} at {path}")]
    #[diagnostic(
        code(fbxguard::missing_document),
        help("Run `fbxguard save` while the appliance is configured correctly.")
    )]
    MissingDocument { kind: String, path: String },

    #[error("Invalid document {path}: {reason}")]
    #[diagnostic(code(fbxguard::document))]
    Document { path: String, reason: String },

    #[error("Restored missing entries: {classes}")]
    #[diagnostic(
        code(fbxguard::drift),
        help("The appliance had lost part of its configuration. Details are in the log.")
    )]
    Drift { classes: String },

    #[error("Restore incomplete for: {classes}")]
    #[diagnostic(code(fbxguard::restore_incomplete))]
    RestoreIncomplete { classes: String },

    // ── Hosts ────────────────────────────────────────────────────────
    #[error("Host '{name}' not found")]
    #[diagnostic(
        code(fbxguard::host_not_found),
        help("Run: fbxguard hosts --all to see known hosts")
    )]
    HostNotFound { name: String },

    #[error("Host '{name}' is not reachable")]
    #[diagnostic(code(fbxguard::host_unreachable))]
    HostUnreachable { name: String },

    // ── Validation / configuration ───────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fbxguard::validation))]
    Validation { field: String, reason: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(fbxguard::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No appliance configured")]
    #[diagnostic(
        code(fbxguard::no_config),
        help(
            "Add a profile to {path}\n\
             or pass the appliance address with --url."
        )
    )]
    NoConfig { path: String },

    #[error("{message}")]
    #[diagnostic(code(fbxguard::config))]
    Config { message: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NotApproved { .. } => exit_code::AUTH,
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::Interrupted => exit_code::INTERRUPTED,
            Self::MissingDocument { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout => Self::Timeout,
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::NotApproved { message } => Self::NotApproved { message },
            CoreError::Cancelled => Self::Interrupted,

            CoreError::Api {
                message,
                code: Some(code),
                ..
            } if code == "insufficient_rights" => Self::PermissionDenied { message },
            CoreError::Api { message, code, .. } => Self::ApiError {
                code: code.unwrap_or_else(|| "unknown".into()),
                message,
            },

            CoreError::ConfigSource { kind, path } => Self::MissingDocument {
                kind: kind.to_string(),
                path,
            },
            CoreError::Document { path, reason } => Self::Document { path, reason },

            err @ (CoreError::ReadOnlyField { .. }
            | CoreError::Apply { .. }
            | CoreError::ChangeLog { .. }
            | CoreError::Internal(_)) => Self::ApiError {
                code: "internal".into(),
                message: err.to_string(),
            },

            CoreError::Config { message } => Self::Config { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::ProfileNotFound { name } => Self::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}
