//! Client for the account service.
//!
//! The account service owns directory identities: it activates, declines and
//! closes accounts, and manages directory group membership.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;
use verification_common::AppResult;
use verification_common::config::AccountApiConfig;

use crate::{build_http_client, check_status, translate};

const SERVICE: &str = "account_api";

/// Operations the verification workflow needs from the account service.
#[async_trait]
pub trait AccountApi: Send + Sync {
    /// Fetch the account record for a directory identity.
    async fn get(&self, ldap_id: &str) -> AppResult<Value>;

    /// Activate the account.
    async fn approve(&self, ldap_id: &str) -> AppResult<()>;

    /// Decline the account, passing the reason and next-steps advice on to
    /// the user-facing notification.
    async fn decline(&self, ldap_id: &str, reason: &str, advice: &str, user_id: &str)
    -> AppResult<()>;

    /// Close the account.
    async fn close(&self, ldap_id: &str, user_id: &str, requester: &str) -> AppResult<()>;

    /// Replace the account's directory group membership.
    async fn update_groups(&self, ldap_id: &str, groups: &Value) -> AppResult<()>;
}

/// HTTP implementation of [`AccountApi`].
pub struct AccountClient {
    http: reqwest::Client,
    url: String,
    version: String,
    master_api_key: String,
}

impl AccountClient {
    /// Build a client from configuration.
    pub fn new(config: &AccountApiConfig, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            url: config.url.trim_end_matches('/').to_string(),
            version: config.version.clone(),
            master_api_key: config.master_api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.url, self.version, path)
    }
}

#[async_trait]
impl AccountApi for AccountClient {
    async fn get(&self, ldap_id: &str) -> AppResult<Value> {
        let response = self
            .http
            .get(self.endpoint("users"))
            .query(&[("id", ldap_id)])
            .bearer_auth(&self.master_api_key)
            .send()
            .await
            .map_err(|e| translate(SERVICE, &e))?;

        check_status(SERVICE, response)?
            .json()
            .await
            .map_err(|e| translate(SERVICE, &e))
    }

    async fn approve(&self, ldap_id: &str) -> AppResult<()> {
        let response = self
            .http
            .post(self.endpoint(&format!("users/{ldap_id}/activate")))
            .bearer_auth(&self.master_api_key)
            .send()
            .await
            .map_err(|e| translate(SERVICE, &e))?;

        check_status(SERVICE, response)?;
        info!(ldap_id, "Activated user");
        Ok(())
    }

    async fn decline(
        &self,
        ldap_id: &str,
        reason: &str,
        advice: &str,
        user_id: &str,
    ) -> AppResult<()> {
        let body = json!({
            "ldap_id": ldap_id,
            "reason": reason,
            "advice": advice,
            "user_id": user_id,
        });

        let response = self
            .http
            .post(self.endpoint("users/decline"))
            .bearer_auth(&self.master_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| translate(SERVICE, &e))?;

        check_status(SERVICE, response)?;
        info!(ldap_id, "Declined user");
        Ok(())
    }

    async fn close(&self, ldap_id: &str, user_id: &str, requester: &str) -> AppResult<()> {
        let body = json!({
            "ldap_id": ldap_id,
            "user_id": user_id,
            "requester": requester,
        });

        let response = self
            .http
            .post(self.endpoint("users/close"))
            .bearer_auth(&self.master_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| translate(SERVICE, &e))?;

        check_status(SERVICE, response)?;
        info!(ldap_id, "Closed account for user");
        Ok(())
    }

    async fn update_groups(&self, ldap_id: &str, groups: &Value) -> AppResult<()> {
        let body = json!({
            "ldap_id": ldap_id,
            "groups": groups,
        });

        let response = self
            .http
            .patch(self.endpoint("users/update_groups"))
            .bearer_auth(&self.master_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| translate(SERVICE, &e))?;

        check_status(SERVICE, response)?;
        info!(ldap_id, "Groups updated for user");
        Ok(())
    }
}
