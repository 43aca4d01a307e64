//! HTTP endpoints.

pub mod general;
pub mod verification;

use axum::Router;

use crate::state::AppState;

/// Build the full application router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(general::router())
        .nest("/v1", verification::router())
}
