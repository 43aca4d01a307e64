//! Database layer for verification-rs.

pub mod entities;
pub mod migrations;
pub mod repositories;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::log::LevelFilter;
use verification_common::{AppError, config::DatabaseConfig};

/// Open a connection pool against the verification database.
///
/// An unreachable or misconfigured database is a startup problem, so the
/// failure surfaces as a configuration error rather than a storage one.
pub async fn connect(database: &DatabaseConfig) -> Result<DatabaseConnection, AppError> {
    let mut options = ConnectOptions::new(&database.url);

    options
        .max_connections(database.max_connections)
        .min_connections(database.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    Database::connect(options)
        .await
        .map_err(|e| AppError::Config(format!("Database connection failed: {e}")))
}

/// Apply any migrations the database is missing.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::StorageWrite(e.to_string()))
}
