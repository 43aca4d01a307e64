//! HTTP clients for the services the verification workflow depends on.
//!
//! Each upstream is wrapped in a thin client that owns a `reqwest::Client`
//! and maps transport failures into [`AppError::Dependency`]. The account and
//! dataset clients sit behind traits so the workflow layer can be tested
//! against fakes.

pub mod account;
pub mod dataset;
pub mod metrics;

pub use account::{AccountApi, AccountClient};
pub use dataset::{DatasetApi, DatasetClient};
pub use metrics::MetricsClient;

use verification_common::{AppError, AppResult};

/// Map a transport-level failure to a dependency error, distinguishing
/// timeouts and connection refusals from other failures.
pub(crate) fn translate(service: &str, err: &reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Dependency(format!("Timeout contacting {service}: {err}"))
    } else if err.is_connect() {
        AppError::Dependency(format!("Connection error contacting {service}: {err}"))
    } else {
        AppError::Dependency(format!("Request to {service} failed: {err}"))
    }
}

/// Reject non-2xx responses.
pub(crate) fn check_status(
    service: &str,
    response: reqwest::Response,
) -> AppResult<reqwest::Response> {
    response.error_for_status().map_err(|err| {
        AppError::Dependency(format!("Received error status from {service}: {err}"))
    })
}

/// Build a `reqwest::Client` with the configured request timeout.
pub(crate) fn build_http_client(timeout: std::time::Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {e}")))
}
