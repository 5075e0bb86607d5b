// ── Resource accessors ──
//
// One accessor per reconcilable class. Each knows how to read the live
// entries keyed by natural key and how to restore a single missing one.

use std::fmt::Debug;
use std::future::Future;

use fbxguard_api::{ApiClient, Entries, IncomingPortPolicy, PortRedirection, StaticLease};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CoreError;

/// The three resource classes under reconciliation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    #[strum(to_string = "port redirections")]
    Redirections,
    #[strum(to_string = "static leases")]
    StaticLeases,
    #[strum(to_string = "incoming ports")]
    IncomingPorts,
}

impl ResourceKind {
    /// Short identifier used in summaries and file names.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Redirections => "redirections",
            Self::StaticLeases => "leases",
            Self::IncomingPorts => "incoming",
        }
    }
}

/// Typed read/write access to one resource class.
pub trait ResourceAccessor: Sync {
    type Entry: Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync;

    fn kind(&self) -> ResourceKind;

    /// The key an entry's own fields imply, for classes whose key is
    /// derived from content rather than assigned.
    fn derived_key(&self, _entry: &Self::Entry) -> Option<String> {
        None
    }

    /// Live entries keyed by natural key.
    fn fetch(&self) -> impl Future<Output = Result<Entries<Self::Entry>, CoreError>> + Send;

    /// Restore one entry missing from the appliance.
    fn apply(
        &self,
        key: &str,
        entry: &Self::Entry,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// WAN port redirections, keyed `"<wan_port_start>/<ip_proto>"`.
#[derive(Clone, Copy)]
pub struct Redirections<'a>(pub &'a ApiClient);

impl ResourceAccessor for Redirections<'_> {
    type Entry = PortRedirection;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Redirections
    }

    fn derived_key(&self, entry: &PortRedirection) -> Option<String> {
        Some(entry.key())
    }

    async fn fetch(&self) -> Result<Entries<PortRedirection>, CoreError> {
        Ok(self.0.list_redirections().await?)
    }

    async fn apply(&self, _key: &str, entry: &PortRedirection) -> Result<(), CoreError> {
        Ok(self.0.create_redirection(entry).await?)
    }
}

/// Static DHCP leases, keyed by hostname.
#[derive(Clone, Copy)]
pub struct StaticLeases<'a>(pub &'a ApiClient);

impl ResourceAccessor for StaticLeases<'_> {
    type Entry = StaticLease;

    fn kind(&self) -> ResourceKind {
        ResourceKind::StaticLeases
    }

    async fn fetch(&self) -> Result<Entries<StaticLease>, CoreError> {
        Ok(self.0.list_static_leases().await?)
    }

    async fn apply(&self, _key: &str, entry: &StaticLease) -> Result<(), CoreError> {
        Ok(self.0.create_static_lease(entry).await?)
    }
}

/// Incoming port policies, keyed by server-assigned id.
///
/// These cannot be created; restoring one means updating it in place
/// with every field it allows to change.
#[derive(Clone, Copy)]
pub struct IncomingPorts<'a>(pub &'a ApiClient);

impl ResourceAccessor for IncomingPorts<'_> {
    type Entry = IncomingPortPolicy;

    fn kind(&self) -> ResourceKind {
        ResourceKind::IncomingPorts
    }

    async fn fetch(&self) -> Result<Entries<IncomingPortPolicy>, CoreError> {
        Ok(self.0.list_incoming_ports().await?)
    }

    async fn apply(&self, key: &str, entry: &IncomingPortPolicy) -> Result<(), CoreError> {
        Ok(self
            .0
            .update_incoming_port(key, entry, &entry.update_payload())
            .await?)
    }
}
