//! Note repository.

use std::sync::Arc;

use crate::entities::{Note, note};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use verification_common::{AppError, AppResult};

/// Note repository for database operations.
#[derive(Clone)]
pub struct NoteRepository {
    db: Arc<DatabaseConnection>,
}

impl NoteRepository {
    /// Create a new note repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Notes for a case, newest first.
    pub async fn find_by_case(&self, case_id: i32) -> AppResult<Vec<note::Model>> {
        Note::find()
            .filter(note::Column::CaseId.eq(case_id))
            .order_by_desc(note::Column::DateAdded)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageRead(e.to_string()))
    }

    /// Whether the case has at least one note.
    pub async fn has_notes(&self, case_id: i32) -> AppResult<bool> {
        let note = Note::find()
            .filter(note::Column::CaseId.eq(case_id))
            .limit(1)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageRead(e.to_string()))?;

        Ok(note.is_some())
    }

    /// Append a note.
    pub async fn create(&self, model: note::ActiveModel) -> AppResult<note::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageWrite(e.to_string()))
    }
}
