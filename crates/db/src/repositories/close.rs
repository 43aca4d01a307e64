//! Close repository.

use std::sync::Arc;

use crate::entities::{Close, close};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use verification_common::{AppError, AppResult};

/// Close repository for database operations.
#[derive(Clone)]
pub struct CloseRepository {
    db: Arc<DatabaseConnection>,
}

impl CloseRepository {
    /// Create a new close repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// The closure record for a case, if one exists.
    pub async fn find_by_case(&self, case_id: i32) -> AppResult<Option<close::Model>> {
        Close::find()
            .filter(close::Column::CaseId.eq(case_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageRead(e.to_string()))
    }

    /// Record a closure.
    pub async fn create(&self, model: close::ActiveModel) -> AppResult<close::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageWrite(e.to_string()))
    }
}
