// App authorization and session endpoints
//
// Raw calls only. Sequencing (register, wait for approval, answer the
// challenge) lives in `auth::Authenticator`.

use serde_json::json;
use tracing::debug;

use crate::auth::AppIdentity;
use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{ApprovalState, AuthorizeGrant, LoginChallenge, SessionGrant};

impl ApiClient {
    /// Ask the appliance to authorize a new application.
    ///
    /// `POST login/authorize/` with the declared identity. The returned
    /// token is unusable until the request is approved on the front panel.
    pub async fn request_authorization(
        &self,
        app_id: &str,
        identity: &AppIdentity,
    ) -> Result<AuthorizeGrant, Error> {
        debug!(app_id, "requesting app authorization");
        let body = json!({
            "app_id": app_id,
            "app_name": identity.app_name,
            "app_version": identity.app_version,
            "device_name": identity.device_name,
        });
        self.post("v4/login/authorize/", Some(&body)).await
    }

    /// Current state of an authorization request.
    ///
    /// `GET login/authorize/{track_id}`
    pub async fn approval_status(&self, track_id: u64) -> Result<ApprovalState, Error> {
        self.get(&format!("v4/login/authorize/{track_id}")).await
    }

    /// Fetch a fresh login challenge.
    ///
    /// `GET login/`
    pub async fn login_challenge(&self) -> Result<LoginChallenge, Error> {
        self.get("v4/login/").await
    }

    /// Exchange the challenge response for a session token.
    ///
    /// `POST login/session/` with `{"app_id", "password"}`
    pub async fn open_session(&self, app_id: &str, password: &str) -> Result<SessionGrant, Error> {
        debug!(app_id, "opening session");
        let body = json!({ "app_id": app_id, "password": password });
        self.post("v4/login/session/", Some(&body)).await
    }

    /// Invalidate the current session on the appliance.
    ///
    /// `POST login/logout/`
    pub async fn logout(&self) -> Result<(), Error> {
        debug!("logging out");
        self.post("v4/login/logout/", None::<&()>).await
    }
}
