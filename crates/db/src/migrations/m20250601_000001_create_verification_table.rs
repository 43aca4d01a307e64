use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Verification::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Verification::CaseId)
                            .integer()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Verification::UserId).string().not_null())
                    .col(ColumnDef::new(Verification::LdapId).string().not_null())
                    .col(
                        ColumnDef::new(Verification::RegistrationData)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Verification::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Verification::DateAdded)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Verification::StaffId).string())
                    .col(ColumnDef::new(Verification::DateAgreed).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_verification_status")
                    .table(Verification::Table)
                    .col(Verification::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_verification_ldap_id")
                    .table(Verification::Table)
                    .col(Verification::LdapId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Verification::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Verification {
    Table,
    CaseId,
    UserId,
    LdapId,
    RegistrationData,
    Status,
    DateAdded,
    StaffId,
    DateAgreed,
}
