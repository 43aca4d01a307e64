//! Close entity: the closure record for a case.
//!
//! Created exactly once per case when closure succeeds; immutable thereafter.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "close")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub close_id: i32,

    pub case_id: i32,

    /// Why the account was closed.
    pub close_detail: String,

    /// Who asked for the closure (the user, or `HMLR` for automated closures).
    pub requester: String,

    /// The staff member who actioned the closure, when there was one.
    #[sea_orm(nullable)]
    pub staff_id: Option<String>,

    pub date_added: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::case::Entity",
        from = "Column::CaseId",
        to = "super::case::Column::CaseId",
        on_delete = "Cascade"
    )]
    Case,
}

impl Related<super::case::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Case.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
