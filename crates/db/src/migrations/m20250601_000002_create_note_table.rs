use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Note::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Note::NoteId)
                            .integer()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Note::CaseId).integer().not_null())
                    .col(ColumnDef::new(Note::NoteText).text().not_null())
                    .col(ColumnDef::new(Note::StaffId).string())
                    .col(
                        ColumnDef::new(Note::DateAdded)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_note_case_id")
                            .from(Note::Table, Note::CaseId)
                            .to(Verification::Table, Verification::CaseId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_note_case_id")
                    .table(Note::Table)
                    .col(Note::CaseId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Note::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Note {
    Table,
    NoteId,
    CaseId,
    NoteText,
    StaffId,
    DateAdded,
}

#[derive(DeriveIden)]
enum Verification {
    Table,
    CaseId,
}
