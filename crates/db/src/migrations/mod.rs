//! Database schema migrations.

use sea_orm_migration::prelude::*;

mod m20250601_000001_create_verification_table;
mod m20250601_000002_create_note_table;
mod m20250601_000003_create_decline_reason_table;
mod m20250601_000004_create_close_table;

/// The migration runner for the verification schema.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_verification_table::Migration),
            Box::new(m20250601_000002_create_note_table::Migration),
            Box::new(m20250601_000003_create_decline_reason_table::Migration),
            Box::new(m20250601_000004_create_close_table::Migration),
        ]
    }
}
