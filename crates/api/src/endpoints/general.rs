//! Service health endpoints.

use axum::{Json, Router, extract::State, routing::get};
use serde_json::{Value, json};

use crate::state::AppState;

/// Routes for service health.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "app": state.app_name,
        "status": "OK",
        "commit": state.commit,
    }))
}
