use anyhow::Result;
use migration::MigratorTrait;
use sea_orm::{ConnectionTrait, DatabaseBackend, EntityTrait, PaginatorTrait};

use super::memory_db;
use crate::{db, post};

#[tokio::test]
async fn connect_with_config_and_migrate() -> Result<()> {
    let db = memory_db().await?;
    assert_eq!(db.get_database_backend(), DatabaseBackend::Sqlite);
    assert_eq!(post::Entity::find().count(&db).await?, 0);
    Ok(())
}

#[tokio::test]
async fn migrations_are_idempotent() -> Result<()> {
    let db = memory_db().await?;
    migration::Migrator::up(&db, None).await?;
    assert_eq!(post::Entity::find().count(&db).await?, 0);
    Ok(())
}

#[tokio::test]
async fn plain_connect_accepts_sqlite_url() -> Result<()> {
    let db = db::connect("sqlite::memory:").await?;
    db.execute_unprepared("SELECT 1").await?;
    Ok(())
}
