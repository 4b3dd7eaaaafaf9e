use crate::config::AppConfig;
use crate::entities::users;
use crate::infrastructure::migrations;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm::{ConnectionTrait, DatabaseBackend, Schema, Statement};
use std::time::Duration;
use tracing::info;

pub async fn setup_database(config: &AppConfig) -> anyhow::Result<DatabaseConnection> {
    info!("📂 Database: {}", config.database_url);

    let mut opt = ConnectOptions::new(&config.database_url);
    opt.max_connections(20)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    if config.database_url.contains(":memory:") {
        // Every pooled connection would otherwise get its own empty database
        opt.max_connections(1);
    } else {
        opt.idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800));
    }

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    Ok(db)
}

/// Creates the base tables and applies every pending versioned migration.
pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    info!("🔄 Creating base tables...");

    let stmts = vec![(
        "users",
        schema
            .create_table_from_entity(users::Entity)
            .if_not_exists()
            .to_owned(),
    )];

    for (name, stmt) in stmts {
        let stmt = builder.build(&stmt);
        db.execute(stmt).await?;
        info!("   - Table '{}' checked/created", name);
    }

    // contacts predates the identity column; its entity describes the migrated shape,
    // so the legacy table is created by hand.
    db.execute(Statement::from_string(
        builder,
        legacy_contacts_table(builder),
    ))
    .await?;
    info!("   - Table 'contacts' checked/created");

    let applied = migrations::migrate_up(db).await?;
    if applied.is_empty() {
        info!("✅ Schema is up to date");
    } else {
        info!("✅ Applied {} migration(s): {:?}", applied.len(), applied);
    }

    Ok(())
}

fn legacy_contacts_table(backend: DatabaseBackend) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS contacts (user_id INTEGER NOT NULL, contact_user_id INTEGER NOT NULL, created_at {})",
        match backend {
            DatabaseBackend::Postgres => "TIMESTAMP WITH TIME ZONE",
            _ => "TIMESTAMP",
        }
    )
}
