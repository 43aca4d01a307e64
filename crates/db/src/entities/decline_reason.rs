//! Decline reason catalog entity.
//!
//! Read-mostly rows used to populate the UI decline-reason picker. Entries
//! are soft-retired by setting `date_ended`; retired entries are excluded
//! from listings.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "decline_reason")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub decline_id: i32,

    /// Short reason summary shown in listings.
    pub decline_description: String,

    /// Full reason text sent to the applicant.
    pub decline_detail: String,

    /// Advice text describing the applicant's next steps.
    pub decline_advice: String,

    pub date_added: DateTimeWithTimeZone,

    /// Set when the entry is retired from use.
    #[sea_orm(nullable)]
    pub date_ended: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
