//! Client for the dataset access service.
//!
//! Holds per-user contact preferences, dataset licence agreements and
//! download history.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;
use verification_common::AppResult;
use verification_common::config::DatasetApiConfig;

use crate::{build_http_client, check_status, translate};

const SERVICE: &str = "dataset_api";

/// Operations the verification workflow needs from the dataset service.
#[async_trait]
pub trait DatasetApi: Send + Sync {
    /// Patch a user's contact preference details.
    async fn update_contact_preference(&self, data: &Value) -> AppResult<()>;

    /// The catalogue of datasets available in the service.
    async fn get_dataset_list_details(&self) -> AppResult<Value>;

    /// A user's licence agreements and download history.
    async fn get_dataset_activity(&self, user_id: &str) -> AppResult<Value>;

    /// All datasets with their licences and the user's agreement state.
    async fn get_user_dataset_access(&self, user_id: &str) -> AppResult<Value>;

    /// Grant or revoke dataset licences for a user.
    async fn update_dataset_access(&self, data: &Value) -> AppResult<Value>;
}

/// HTTP implementation of [`DatasetApi`].
pub struct DatasetClient {
    http: reqwest::Client,
    url: String,
}

impl DatasetClient {
    /// Build a client from configuration.
    pub fn new(config: &DatasetApiConfig, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            url: config.url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DatasetApi for DatasetClient {
    async fn update_contact_preference(&self, data: &Value) -> AppResult<()> {
        let response = self
            .http
            .patch(format!("{}/users/contact_preference", self.url))
            .json(data)
            .send()
            .await
            .map_err(|e| translate(SERVICE, &e))?;

        check_status(SERVICE, response)?;
        info!("Updated user contact preference");
        Ok(())
    }

    async fn get_dataset_list_details(&self) -> AppResult<Value> {
        let response = self
            .http
            .get(format!("{}/datasets", self.url))
            .query(&[("simple", "true")])
            .send()
            .await
            .map_err(|e| translate(SERVICE, &e))?;

        check_status(SERVICE, response)?
            .json()
            .await
            .map_err(|e| translate(SERVICE, &e))
    }

    async fn get_dataset_activity(&self, user_id: &str) -> AppResult<Value> {
        let response = self
            .http
            .get(format!("{}/users/dataset-activity/{user_id}", self.url))
            .send()
            .await
            .map_err(|e| translate(SERVICE, &e))?;

        check_status(SERVICE, response)?
            .json()
            .await
            .map_err(|e| translate(SERVICE, &e))
    }

    async fn get_user_dataset_access(&self, user_id: &str) -> AppResult<Value> {
        let response = self
            .http
            .get(format!("{}/users/dataset-access/{user_id}", self.url))
            .send()
            .await
            .map_err(|e| translate(SERVICE, &e))?;

        check_status(SERVICE, response)?
            .json()
            .await
            .map_err(|e| translate(SERVICE, &e))
    }

    async fn update_dataset_access(&self, data: &Value) -> AppResult<Value> {
        let response = self
            .http
            .post(format!("{}/users/licence", self.url))
            .json(data)
            .send()
            .await
            .map_err(|e| translate(SERVICE, &e))?;

        check_status(SERVICE, response)?
            .json()
            .await
            .map_err(|e| translate(SERVICE, &e))
    }
}
