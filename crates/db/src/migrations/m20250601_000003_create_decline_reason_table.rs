use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeclineReason::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeclineReason::DeclineId)
                            .integer()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DeclineReason::DeclineDescription)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeclineReason::DeclineDetail)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeclineReason::DeclineAdvice)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeclineReason::DateAdded)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(DeclineReason::DateEnded).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeclineReason::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DeclineReason {
    Table,
    DeclineId,
    DeclineDescription,
    DeclineDetail,
    DeclineAdvice,
    DateAdded,
    DateEnded,
}
