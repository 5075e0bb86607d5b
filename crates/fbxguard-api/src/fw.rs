// Firewall endpoints
//
// WAN port redirections (`fw/redir/`) and incoming service ports
// (`fw/incoming/`).

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{Entries, IncomingPortPolicy, PortRedirection};

impl ApiClient {
    /// List WAN port redirections keyed by `"<wan_port_start>/<ip_proto>"`.
    ///
    /// `GET fw/redir/`
    pub async fn list_redirections(&self) -> Result<Entries<PortRedirection>, Error> {
        debug!("listing port redirections");
        let list: Option<Vec<PortRedirection>> = self.get("v4/fw/redir/").await?;
        Ok(list
            .unwrap_or_default()
            .into_iter()
            .map(|r| (r.key(), r))
            .collect())
    }

    /// Create a WAN port redirection.
    ///
    /// `POST fw/redir/`
    pub async fn create_redirection(&self, redirection: &PortRedirection) -> Result<(), Error> {
        debug!(key = %redirection.key(), "creating port redirection");
        let _: serde_json::Value = self.post("v4/fw/redir/", Some(redirection)).await?;
        Ok(())
    }

    /// List incoming port policies keyed by their server-assigned id,
    /// with `id`, `min_port` and `max_port` stripped.
    ///
    /// `GET fw/incoming/`
    pub async fn list_incoming_ports(&self) -> Result<Entries<IncomingPortPolicy>, Error> {
        debug!("listing incoming port policies");
        let list: Option<Vec<serde_json::Map<String, serde_json::Value>>> =
            self.get("v4/fw/incoming/").await?;
        Ok(list
            .unwrap_or_default()
            .into_iter()
            .filter_map(IncomingPortPolicy::from_raw)
            .collect())
    }

    /// Update an incoming port policy in place.
    ///
    /// `PUT fw/incoming/{id}` with `payload`. Fails with
    /// [`Error::ReadOnlyField`] before any request is sent when `payload`
    /// names a field `policy` marks read-only; build it with
    /// [`IncomingPortPolicy::update_payload`] to stay within the contract.
    pub async fn update_incoming_port(
        &self,
        id: &str,
        policy: &IncomingPortPolicy,
        payload: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), Error> {
        if let Some(field) = policy
            .read_only_fields()
            .iter()
            .copied()
            .find(|f| payload.contains_key(*f))
        {
            return Err(Error::ReadOnlyField {
                id: id.to_owned(),
                field,
            });
        }
        debug!(id, "updating incoming port policy");
        let _: serde_json::Value = self.put(&format!("v4/fw/incoming/{id}"), payload).await?;
        Ok(())
    }
}
