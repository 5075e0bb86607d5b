// fbxguard-api: Async Rust client for the Freebox OS control API

pub mod auth;
pub mod client;
mod dhcp;
pub mod error;
mod fw;
pub mod lan;
mod login;
pub mod models;
pub mod transport;

pub use auth::{
    AppCredential, AppIdentity, ApprovalPolicy, AuthState, Authenticator, CredentialStore,
    session_password,
};
pub use client::ApiClient;
pub use error::{AuthError, Error};
pub use lan::LanZone;
pub use models::{Entries, IncomingPortPolicy, NetworkNode, PortRedirection, StaticLease};
pub use transport::{TlsMode, TransportConfig};
