//! Workflow services.

pub mod verification;

pub use verification::{VerificationService, can_perform_action};
