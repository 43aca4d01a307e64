//! Case repository.

use std::sync::Arc;

use crate::entities::{Case, case};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use verification_common::{AppError, AppResult};

/// Optional partial-match filters over the registration document.
///
/// Blank fields are not filtered on; all-blank filters match every case.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organisation_name: Option<String>,
    pub email: Option<String>,
}

impl SearchFilters {
    fn terms(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("first_name", self.first_name.as_deref()),
            ("last_name", self.last_name.as_deref()),
            ("organisation_name", self.organisation_name.as_deref()),
            ("email", self.email.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| match value {
            Some(v) if !v.is_empty() => Some((field, v)),
            _ => None,
        })
    }
}

/// Case repository for database operations.
#[derive(Clone)]
pub struct CaseRepository {
    db: Arc<DatabaseConnection>,
}

impl CaseRepository {
    /// Create a new case repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a case by ID.
    pub async fn find_by_id(&self, case_id: i32) -> AppResult<Option<case::Model>> {
        Case::find_by_id(case_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageRead(e.to_string()))
    }

    /// Find a case by its directory identity.
    pub async fn find_by_ldap_id(&self, ldap_id: &str) -> AppResult<Option<case::Model>> {
        Case::find()
            .filter(case::Column::LdapId.eq(ldap_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageRead(e.to_string()))
    }

    /// All pending cases, newest first.
    pub async fn find_pending(&self) -> AppResult<Vec<case::Model>> {
        Case::find()
            .filter(case::Column::Status.eq(case::CaseStatus::Pending))
            .order_by_desc(case::Column::DateAdded)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageRead(e.to_string()))
    }

    /// Case-insensitive partial match over the registration document.
    pub async fn search(&self, filters: &SearchFilters) -> AppResult<Vec<case::Model>> {
        let mut query = Case::find();
        for (field, value) in filters.terms() {
            query = query.filter(Expr::cust_with_values(
                format!("registration_data->>'{field}' ILIKE $1"),
                [format!("%{value}%")],
            ));
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageRead(e.to_string()))
    }

    /// Insert a new case.
    pub async fn create(&self, model: case::ActiveModel) -> AppResult<case::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageWrite(e.to_string()))
    }

    /// Persist changes to an existing case.
    pub async fn update(&self, model: case::ActiveModel) -> AppResult<case::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageWrite(e.to_string()))
    }

    /// Attempt to take the case lock for `owner`.
    ///
    /// Compare-and-swap in a single statement: the row is claimed only when
    /// it is unlocked or already held by `owner`, closing the window between
    /// a read-side ownership check and the write. Returns whether the lock
    /// was taken.
    pub async fn try_set_lock_owner(&self, case_id: i32, owner: &str) -> AppResult<bool> {
        let result = Case::update_many()
            .col_expr(case::Column::StaffId, Expr::value(owner))
            .filter(case::Column::CaseId.eq(case_id))
            .filter(
                Condition::any()
                    .add(case::Column::StaffId.is_null())
                    .add(case::Column::StaffId.eq(owner)),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageWrite(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Release the case lock regardless of the current holder.
    pub async fn clear_lock_owner(&self, case_id: i32) -> AppResult<()> {
        Case::update_many()
            .col_expr(case::Column::StaffId, Expr::value(Option::<String>::None))
            .filter(case::Column::CaseId.eq(case_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageWrite(e.to_string()))?;

        Ok(())
    }
}
