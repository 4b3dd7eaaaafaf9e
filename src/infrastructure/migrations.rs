//! Versioned, reversible schema changes applied on top of the base tables.
//!
//! Each backend has its own directory under `migrations/`, embedded at build
//! time. sqlx records applied versions in `_sqlx_migrations`.

use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection};
use sqlx::migrate::{Migrate, MigrateError, Migrator};
use sqlx::{Database, Pool};
use tracing::info;

pub static SQLITE: Migrator = sqlx::migrate!("./migrations/sqlite");
pub static POSTGRES: Migrator = sqlx::migrate!("./migrations/postgres");

fn describe(migrator: &Migrator, version: i64) -> String {
    migrator
        .iter()
        .find(|m| m.version == version)
        .map(|m| format!("{} {}", version, m.description))
        .unwrap_or_else(|| version.to_string())
}

async fn applied_versions<DB>(pool: &Pool<DB>) -> Result<Vec<i64>, MigrateError>
where
    DB: Database,
    DB::Connection: Migrate,
{
    let mut conn = pool.acquire().await?;
    conn.ensure_migrations_table().await?;
    let mut versions: Vec<i64> = conn
        .list_applied_migrations()
        .await?
        .into_iter()
        .map(|m| m.version)
        .collect();
    versions.sort_unstable();
    Ok(versions)
}

async fn run_on<DB>(migrator: &Migrator, pool: &Pool<DB>) -> Result<Vec<i64>, MigrateError>
where
    DB: Database,
    DB::Connection: Migrate,
{
    let applied = applied_versions(pool).await?;
    let pending: Vec<i64> = migrator
        .iter()
        .filter(|m| !m.migration_type.is_down_migration() && !applied.contains(&m.version))
        .map(|m| m.version)
        .collect();

    for version in &pending {
        info!("⬆️  Applying migration {}", describe(migrator, *version));
    }
    migrator.run(pool).await?;

    Ok(pending)
}

async fn undo_last_on<DB>(migrator: &Migrator, pool: &Pool<DB>) -> Result<Option<i64>, MigrateError>
where
    DB: Database,
    DB::Connection: Migrate,
{
    let applied = applied_versions(pool).await?;
    let Some((&last, earlier)) = applied.split_last() else {
        return Ok(None);
    };

    info!("⬇️  Reverting migration {}", describe(migrator, last));
    // undo reverts everything newer than the target
    let target = earlier.last().copied().unwrap_or(0);
    migrator.undo(pool, target).await?;

    Ok(Some(last))
}

/// Applies pending migrations in version order and returns the versions that ran.
pub async fn migrate_up(db: &DatabaseConnection) -> anyhow::Result<Vec<i64>> {
    let ran = match db.get_database_backend() {
        DatabaseBackend::Sqlite => run_on(&SQLITE, db.get_sqlite_connection_pool()).await?,
        DatabaseBackend::Postgres => run_on(&POSTGRES, db.get_postgres_connection_pool()).await?,
        other => anyhow::bail!("No migrations for backend {:?}", other),
    };
    Ok(ran)
}

/// Reverts the most recently applied migration, if any.
pub async fn rollback_last(db: &DatabaseConnection) -> anyhow::Result<Option<i64>> {
    let reverted = match db.get_database_backend() {
        DatabaseBackend::Sqlite => undo_last_on(&SQLITE, db.get_sqlite_connection_pool()).await?,
        DatabaseBackend::Postgres => {
            undo_last_on(&POSTGRES, db.get_postgres_connection_pool()).await?
        }
        other => anyhow::bail!("No migrations for backend {:?}", other),
    };
    Ok(reverted)
}
