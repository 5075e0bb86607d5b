// fbxguard-core: Gap-filling reconciliation between saved documents and a live appliance.

pub mod appliance;
pub mod changelog;
pub mod config;
pub mod documents;
pub mod error;
pub mod reconcile;
pub mod resource;
pub mod restore;

// ── Primary re-exports ──────────────────────────────────────────────
pub use appliance::Appliance;
pub use changelog::ChangeLog;
pub use config::{ApplianceConfig, TlsVerification};
pub use documents::{check_keys, load_document, save_document};
pub use error::CoreError;
pub use reconcile::{ChangeReport, Discrepancy, ReconcileFailure, ReconcileOutcome, Reconciler};
pub use resource::{IncomingPorts, Redirections, ResourceAccessor, ResourceKind, StaticLeases};
pub use restore::{
    ClassPlan, ClassResult, RestorePlan, RestoreSummary, SavedDocument, restore, snapshot,
};

// API types consumers need without depending on fbxguard-api directly.
pub use fbxguard_api::{
    AppIdentity, ApprovalPolicy, Entries, IncomingPortPolicy, LanZone, NetworkNode,
    PortRedirection, StaticLease,
};
