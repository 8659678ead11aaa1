//! Version-tracked schema migrations for the libSQL state store.
//!
//! `run_migrations()` reads the highest applied version from `_migrations`
//! and applies the newer entries of `MIGRATIONS` in order.

use libsql::{Connection, params};
use tracing::info;

use crate::error::StorageError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "conversation_state",
    sql: r#"
        CREATE TABLE IF NOT EXISTS conversation_state (
            conversation_id TEXT PRIMARY KEY,
            state TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#,
}];

/// Apply every migration newer than the recorded version.
pub async fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        (),
    )
    .await
    .map_err(|e| StorageError::Query(format!("create _migrations: {e}")))?;

    let current = current_version(conn).await?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        conn.execute_batch(migration.sql)
            .await
            .map_err(|e| StorageError::Query(format!("migration {}: {e}", migration.name)))?;
        conn.execute(
            "INSERT INTO _migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![
                migration.version,
                migration.name,
                chrono::Utc::now().to_rfc3339()
            ],
        )
        .await
        .map_err(|e| StorageError::Query(format!("record migration {}: {e}", migration.name)))?;
        info!(version = migration.version, name = migration.name, "Applied migration");
    }

    Ok(())
}

async fn current_version(conn: &Connection) -> Result<i64, StorageError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| StorageError::Query(format!("read migration version: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => row
            .get::<i64>(0)
            .map_err(|e| StorageError::Query(format!("read migration version: {e}"))),
        Ok(None) => Ok(0),
        Err(e) => Err(StorageError::Query(format!("read migration version: {e}"))),
    }
}
