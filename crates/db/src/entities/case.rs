//! Case entity: one verification record per user registration under review.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Review status of a case.
///
/// Status only moves forward: `Pending -> {Approved, Declined}` and
/// `Approved -> Closed`. The transitions are enforced by the service layer,
/// not the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum CaseStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Approved")]
    Approved,
    #[sea_orm(string_value = "Declined")]
    Declined,
    #[sea_orm(string_value = "Closed")]
    Closed,
}

impl CaseStatus {
    /// Stored label for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Declined => "Declined",
            Self::Closed => "Closed",
        }
    }

    /// Whether the case has been decided one way or the other.
    #[must_use]
    pub const fn is_resolved(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "verification")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub case_id: i32,

    /// Opaque external identifier, immutable after creation.
    pub user_id: String,

    /// Directory identity, immutable after creation.
    pub ldap_id: String,

    /// Schema-less applicant document (name, contact info, organisation...).
    #[sea_orm(column_type = "JsonBinary")]
    pub registration_data: Json,

    pub status: CaseStatus,

    pub date_added: DateTimeWithTimeZone,

    /// The staff member currently holding the case lock, while Pending.
    #[sea_orm(nullable)]
    pub staff_id: Option<String>,

    /// Set when the status transitions to Approved or Declined.
    #[sea_orm(nullable)]
    pub date_agreed: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Display status shown to staff.
    ///
    /// A Pending case with at least one note reads as `In Progress`; the
    /// value is derived, never stored.
    #[must_use]
    pub fn display_status(&self, has_notes: bool) -> &'static str {
        if self.status == CaseStatus::Pending && has_notes {
            "In Progress"
        } else {
            self.status.as_str()
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::note::Entity")]
    Note,

    #[sea_orm(has_many = "super::close::Entity")]
    Close,
}

impl Related<super::note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Note.def()
    }
}

impl Related<super::close::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Close.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
