//! Decline reason repository.

use std::sync::Arc;

use crate::entities::{DeclineReason, decline_reason};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use verification_common::{AppError, AppResult};

/// Decline reason repository for database operations.
#[derive(Clone)]
pub struct DeclineReasonRepository {
    db: Arc<DatabaseConnection>,
}

impl DeclineReasonRepository {
    /// Create a new decline reason repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Active (non-retired) decline reasons, in insertion order.
    pub async fn find_active(&self) -> AppResult<Vec<decline_reason::Model>> {
        DeclineReason::find()
            .filter(decline_reason::Column::DateEnded.is_null())
            .order_by_asc(decline_reason::Column::DeclineId)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageRead(e.to_string()))
    }
}
