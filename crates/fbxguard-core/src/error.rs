// ── Core error types ──
//
// User-facing errors from fbxguard-core. Consumers never see HTTP status
// codes or envelope internals directly; `From<fbxguard_api::Error>`
// translates transport-layer failures into domain variants.

use fbxguard_api::AuthError;
use thiserror::Error;

use crate::resource::ResourceKind;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to appliance at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    Timeout,

    // ── Authorization errors ─────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The front-panel approval was refused, timed out, or never came.
    #[error("Application not approved: {message}")]
    NotApproved { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    // ── Appliance errors ─────────────────────────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// The appliance `error_code`, e.g. `insufficient_rights`.
        code: Option<String>,
        status: Option<u16>,
    },

    #[error("Refusing to change read-only field '{field}' of incoming port '{id}'")]
    ReadOnlyField { id: String, field: &'static str },

    // ── Reconciliation errors ────────────────────────────────────────
    /// The desired document for a resource class is missing.
    #[error("No {kind} document to reload at {path}")]
    ConfigSource { kind: ResourceKind, path: String },

    #[error("Invalid document {path}: {reason}")]
    Document { path: String, reason: String },

    #[error("Cannot write change log {path}: {reason}")]
    ChangeLog { path: String, reason: String },

    /// A corrective write was refused; drift was already reported.
    #[error("Failed to restore {kind} entry '{key}': {message}")]
    Apply {
        kind: ResourceKind,
        key: String,
        message: String,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<fbxguard_api::Error> for CoreError {
    fn from(err: fbxguard_api::Error) -> Self {
        use fbxguard_api::Error as ApiError;

        match err {
            ApiError::Auth(auth) => auth.into(),
            ApiError::CredentialStore { path, reason } => CoreError::Config {
                message: format!("credential file {path}: {reason}"),
            },
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ref e @ (ApiError::Http { .. } | ApiError::Rejected { .. }) if e.is_auth() => {
                CoreError::AuthenticationFailed {
                    message: e.to_string(),
                }
            }
            ApiError::Http {
                path,
                status,
                code,
                message,
            } => CoreError::Api {
                message: format!("{path}: {message}"),
                code,
                status: Some(status),
            },
            ApiError::Rejected {
                path,
                code,
                message,
            } => CoreError::Api {
                message: format!("{path}: {message}"),
                code: Some(code),
                status: None,
            },
            ApiError::ReadOnlyField { id, field } => CoreError::ReadOnlyField { id, field },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Cancelled => CoreError::Cancelled,
            AuthError::Timeout | AuthError::Denied | AuthError::DeadlineExceeded { .. } => {
                CoreError::NotApproved {
                    message: err.to_string(),
                }
            }
            AuthError::NoAppId => CoreError::Config {
                message: "no stored app credential and no app_id to register with".into(),
            },
            AuthError::SessionRejected { message } => CoreError::AuthenticationFailed { message },
        }
    }
}
