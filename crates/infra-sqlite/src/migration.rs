// Schema migrations
//
// Each entry runs once, in version order, inside its own transaction.
// The applied version is recorded in the same transaction.

use sqlx::SqlitePool;
use tracing::info;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "queues, topics & messages",
    sql: include_str!("../migrations/001_initial_schema.sql"),
}];

/// Bring the schema up to the latest version
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    let current: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
        .fetch_one(pool)
        .await?;

    let pending = pending_migrations(current);
    if pending.is_empty() {
        info!(version = current, "Schema is up to date");
        return Ok(());
    }

    for migration in pending {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.sql).execute(&mut *tx).await?;
        sqlx::query(
            "INSERT INTO schema_version (version, applied_at)
             VALUES (?, CAST(strftime('%s', 'now') AS INTEGER) * 1000)",
        )
        .bind(migration.version)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
    }

    Ok(())
}

fn pending_migrations(current: i64) -> &'static [Migration] {
    let start = MIGRATIONS
        .iter()
        .position(|m| m.version > current)
        .unwrap_or(MIGRATIONS.len());
    &MIGRATIONS[start..]
}
