use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Close::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Close::CloseId)
                            .integer()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Close::CaseId).integer().not_null())
                    .col(ColumnDef::new(Close::CloseDetail).text().not_null())
                    .col(ColumnDef::new(Close::Requester).string().not_null())
                    .col(ColumnDef::new(Close::StaffId).string())
                    .col(
                        ColumnDef::new(Close::DateAdded)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_close_case_id")
                            .from(Close::Table, Close::CaseId)
                            .to(Verification::Table, Verification::CaseId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_close_case_id")
                    .table(Close::Table)
                    .col(Close::CaseId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Close::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Close {
    Table,
    CloseId,
    CaseId,
    CloseDetail,
    Requester,
    StaffId,
    DateAdded,
}

#[derive(DeriveIden)]
enum Verification {
    Table,
    CaseId,
}
