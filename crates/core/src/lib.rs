//! Core workflow logic for verification-rs.

pub mod models;
pub mod services;

pub use models::*;
pub use services::VerificationService;
