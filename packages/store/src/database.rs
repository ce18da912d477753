use std::time::Duration;

use common::config::{DatabaseConfig, DatabaseKind};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::info;

/// Tables in dependency order, parents first.
pub const TABLES: [&str; 7] = [
    "User", "Tweet", "Hashtag", "Mention", "URLData", "Geotag", "Media",
];

/// How many sessions may write concurrently, `None` for no backend limit.
pub fn writer_limit(kind: DatabaseKind) -> Option<usize> {
    match kind {
        DatabaseKind::Sqlite => Some(1),
        DatabaseKind::Postgres => None,
    }
}

/// Open a connection pool capped at `max_connections`.
pub async fn connect(config: &DatabaseConfig, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    connect_url(&config.url(), max_connections).await
}

pub async fn connect_url(db_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    opt.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(false);

    Database::connect(opt).await
}

/// A single-connection session owned by exactly one worker.
pub async fn open_session(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    connect(config, 1).await
}

/// Create any missing tables.
pub async fn sync_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.get_schema_registry("store::entity::*").sync(db).await?;
    Ok(())
}

/// Connect and make sure the schema exists.
pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let db = connect(config, 1).await?;
    sync_schema(&db).await?;
    info!(kind = ?config.kind, "Database schema ready");
    Ok(db)
}

/// Drop every table, children first.
pub async fn drop_tables<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    for table in TABLES.iter().rev() {
        db.execute_unprepared(&format!("DROP TABLE IF EXISTS \"{table}\""))
            .await?;
        info!(table, "Dropped table");
    }
    Ok(())
}
