// DHCP endpoints

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{Entries, RawLease, StaticLease};

impl ApiClient {
    /// Static leases keyed by hostname, reduced to `{mac, ip}`.
    ///
    /// `GET dhcp/static_lease/`
    pub async fn list_static_leases(&self) -> Result<Entries<StaticLease>, Error> {
        debug!("listing static DHCP leases");
        self.list_leases("v4/dhcp/static_lease/").await
    }

    /// Dynamic leases keyed by hostname, same shape as static ones.
    ///
    /// `GET dhcp/dynamic_lease/`
    pub async fn list_dynamic_leases(&self) -> Result<Entries<StaticLease>, Error> {
        debug!("listing dynamic DHCP leases");
        self.list_leases("v4/dhcp/dynamic_lease/").await
    }

    /// Create a static lease.
    ///
    /// `POST dhcp/static_lease/`
    pub async fn create_static_lease(&self, lease: &StaticLease) -> Result<(), Error> {
        debug!(mac = %lease.mac, ip = %lease.ip, "creating static lease");
        let _: serde_json::Value = self.post("v4/dhcp/static_lease/", Some(lease)).await?;
        Ok(())
    }

    async fn list_leases(&self, path: &str) -> Result<Entries<StaticLease>, Error> {
        let list: Option<Vec<RawLease>> = self.get(path).await?;
        Ok(list
            .unwrap_or_default()
            .into_iter()
            .map(|l| {
                (
                    l.hostname,
                    StaticLease {
                        mac: l.mac,
                        ip: l.ip,
                    },
                )
            })
            .collect())
    }
}
