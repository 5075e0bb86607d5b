use thiserror::Error;

/// Top-level error type for the `fbxguard-api` crate.
///
/// Covers every failure mode of the appliance API surface: transport,
/// the `{success, result, error_code, msg}` envelope, app authorization,
/// credential persistence, and write-contract violations.
/// `fbxguard-core` maps these into domain diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// App authorization or session opening failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The on-disk app credential could not be read or written.
    #[error("Credential store error at {path}: {reason}")]
    CredentialStore { path: String, reason: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success HTTP status. `code` is the appliance's `error_code`
    /// when the body carried one.
    #[error("Box API error on {path} (HTTP {status}): {message}")]
    Http {
        path: String,
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// HTTP succeeded but the envelope reported `success: false`.
    #[error("Box API failure on {path}: {code} / {message}")]
    Rejected {
        path: String,
        code: String,
        message: String,
    },

    /// An update payload tried to set a field the policy marks read-only.
    #[error("Field '{field}' is read-only on incoming port policy '{id}'")]
    ReadOnlyField { id: String, field: &'static str },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

/// Failures of the app authorization and session handshake.
///
/// All of them are fatal to the current run; the client never keeps a
/// partially opened session after one of these.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No persisted credential and no app id declared to register with.
    #[error("No application ID found")]
    NoAppId,

    /// The appliance gave up waiting for the front-panel approval.
    #[error("Timeout waiting for application credentials validation")]
    Timeout,

    /// The request was refused on the appliance (or the app is unknown to it).
    #[error("Application credentials request was rejected")]
    Denied,

    /// The challenge response was not accepted.
    #[error("Session opening rejected: {message}")]
    SessionRejected { message: String },

    /// The caller cancelled the approval wait.
    #[error("Approval wait cancelled")]
    Cancelled,

    /// The caller-supplied deadline elapsed before approval.
    #[error("Approval still pending after {waited_secs}s")]
    DeadlineExceeded { waited_secs: u64 },
}

/// Envelope codes meaning the session or app token is no longer valid.
const AUTH_ERROR_CODES: [&str; 3] = ["auth_required", "invalid_token", "invalid_session"];

impl Error {
    /// Returns `true` if the appliance refused our identity or session.
    ///
    /// A 403 carrying another code (e.g. `insufficient_rights`) is a
    /// permission problem, not an authentication one.
    pub fn is_auth(&self) -> bool {
        if matches!(self, Self::Auth(_)) {
            return true;
        }
        match self.api_error_code() {
            Some(code) => AUTH_ERROR_CODES.contains(&code),
            None => matches!(self, Self::Http { status: 403, .. }),
        }
    }

    /// The appliance `error_code`, if the failure carried one.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Http { code, .. } => code.as_deref(),
            Self::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }
}
