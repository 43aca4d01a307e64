//! Client for the metrics service.
//!
//! Metric delivery is best-effort: failures are retried a configured number
//! of times and then logged and dropped, so a metrics outage never fails the
//! workflow operation that produced the event.

use std::time::Duration;

use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use verification_common::AppResult;
use verification_common::config::MetricsApiConfig;

use crate::{build_http_client, check_status, translate};

const SERVICE: &str = "metric_api";

/// HTTP client for the metrics service.
pub struct MetricsClient {
    http: reqwest::Client,
    url: String,
    retries: u32,
}

impl MetricsClient {
    /// Build a client from configuration.
    pub fn new(config: &MetricsApiConfig, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            url: config.url.trim_end_matches('/').to_string(),
            retries: config.retries,
        })
    }

    /// Deliver a single metric event.
    async fn add_event(&self, payload: &Value) -> AppResult<()> {
        let response = self
            .http
            .post(format!("{}/v1/metric", self.url))
            .json(payload)
            .send()
            .await
            .map_err(|e| translate(SERVICE, &e))?;

        check_status(SERVICE, response)?;
        Ok(())
    }

    /// Record an activity against a case, retrying on failure.
    ///
    /// `case_details` is the serialized case; its registration document is
    /// flattened into the top level before the payload is shaped. Delivery is
    /// attempted once and retried `retries` more times; errors are logged and
    /// swallowed.
    pub async fn record_event(&self, activity: &str, case_details: Map<String, Value>) {
        let mut data = flatten_case_details(case_details);
        data.insert("activity_type".to_string(), json!(activity));

        let payload = build_payload(&data);

        for attempt in 0..total_attempts(self.retries) {
            match self.add_event(&payload).await {
                Ok(()) => {
                    debug!(activity, "Metric event delivered");
                    return;
                }
                Err(error) => {
                    warn!(activity, attempt, %error, "Metric event delivery failed");
                }
            }
        }
    }

    /// Record a `role added` or `role removed` event per licence change.
    pub async fn record_dataset_access_events<'a, I>(
        &self,
        case_details: &Map<String, Value>,
        licences: I,
    ) where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        for (licence_id, agreed) in licences {
            let mut data = case_details.clone();
            data.insert("dataset".to_string(), json!(licence_id));
            let activity = if agreed { "role added" } else { "role removed" };
            self.record_event(activity, data).await;
        }
    }
}

/// One initial delivery attempt plus the configured retries.
const fn total_attempts(retries: u32) -> u32 {
    retries.saturating_add(1)
}

/// Merge the case's registration document into the top-level detail map.
fn flatten_case_details(mut data: Map<String, Value>) -> Map<String, Value> {
    if let Some(Value::Object(registration)) = data.remove("registration_data") {
        data.extend(registration);
    }
    data
}

/// Shape case details into the metric service's event envelope.
fn build_payload(data: &Map<String, Value>) -> Value {
    let mut user = Map::new();
    let mut activity = Map::new();
    activity.insert("dataset".to_string(), Value::Null);
    activity.insert("filename".to_string(), Value::Null);

    for (key, value) in data {
        match key.as_str() {
            "user_id" => {
                user.insert("ckan_user_id".to_string(), value.clone());
            }
            "user_type" | "status" => {
                user.insert(key.clone(), value.clone());
            }
            "activity_type" | "dataset" => {
                activity.insert(key.clone(), value.clone());
            }
            _ => {}
        }
    }

    json!({"user": user, "activity": activity})
}
