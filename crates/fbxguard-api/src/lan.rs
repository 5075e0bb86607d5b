// LAN browser and system endpoints
//
// Read-only queries; nothing here is reconciled.

use std::collections::BTreeMap;

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{NetworkNode, RawLanHost};

/// LAN browser interface to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanZone {
    /// The main LAN.
    #[default]
    Public,
    /// The guest Wi-Fi network.
    WifiGuest,
}

impl LanZone {
    pub fn as_path(self) -> &'static str {
        match self {
            Self::Public => "pub",
            Self::WifiGuest => "wifiguest",
        }
    }
}

impl ApiClient {
    /// Hosts seen on a LAN zone, keyed by primary name.
    ///
    /// `GET lan/browser/{zone}/`. Each node carries the address of its
    /// most recently reachable IPv4 record, or no address at all.
    pub async fn list_network_nodes(
        &self,
        zone: LanZone,
    ) -> Result<BTreeMap<String, NetworkNode>, Error> {
        debug!(zone = zone.as_path(), "browsing LAN");
        let hosts: Option<Vec<RawLanHost>> = self
            .get(&format!("v4/lan/browser/{}/", zone.as_path()))
            .await?;
        Ok(hosts
            .unwrap_or_default()
            .into_iter()
            .map(|h| {
                let node = NetworkNode::from(h);
                (node.name.clone(), node)
            })
            .collect())
    }

    /// Appliance system information.
    ///
    /// `GET system/`
    ///
    /// Returns loosely-typed JSON because the field set varies by model
    /// and firmware.
    pub async fn get_system_info(&self) -> Result<serde_json::Value, Error> {
        debug!("fetching system info");
        self.get("v4/system/").await
    }
}
