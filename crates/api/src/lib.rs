//! HTTP API for verification-rs.

pub mod endpoints;
pub mod state;

pub use endpoints::router;
pub use state::AppState;
