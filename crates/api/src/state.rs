//! Shared application state.

use std::sync::Arc;

use verification_clients::MetricsClient;
use verification_core::VerificationService;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The case workflow service.
    pub verification: Arc<VerificationService>,
    /// Best-effort metric delivery.
    pub metrics: Arc<MetricsClient>,
    /// Service name reported by the health endpoint.
    pub app_name: String,
    /// Build commit reported by the health endpoint.
    pub commit: String,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        verification: Arc<VerificationService>,
        metrics: Arc<MetricsClient>,
        app_name: String,
        commit: String,
    ) -> Self {
        Self {
            verification,
            metrics,
            app_name,
            commit,
        }
    }
}
