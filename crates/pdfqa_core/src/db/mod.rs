use std::collections::HashSet;
use std::path::Path;

use rusqlite::Connection;

use crate::error::AppError;

/// Ordered schema steps for the local log store, keyed by file name.
const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_log_rows.sql",
    include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../migrations/0001_log_rows.sql"
    )),
)];

fn db_error(code: &'static str, message: String) -> impl FnOnce(rusqlite::Error) -> AppError {
    move |e| AppError::new(code, message).with_details(e.to_string())
}

pub fn open(path: &Path) -> Result<Connection, AppError> {
    Connection::open(path).map_err(|e| {
        AppError::new("DB_OPEN_FAILED", "Failed to open log database")
            .with_details(format!("path={}; err={e}", path.display()))
    })
}

pub fn open_in_memory() -> Result<Connection, AppError> {
    Connection::open_in_memory().map_err(db_error(
        "DB_OPEN_FAILED",
        "Failed to open in-memory log database".to_string(),
    ))
}

/// Names of the schema steps already recorded in `_migrations`, oldest first.
pub fn applied_migrations(conn: &Connection) -> Result<Vec<String>, AppError> {
    let mut stmt = conn
        .prepare("SELECT name FROM _migrations ORDER BY name")
        .map_err(db_error(
            "DB_MIGRATIONS_QUERY_FAILED",
            "Failed to list applied migrations".to_string(),
        ))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(db_error(
            "DB_MIGRATIONS_QUERY_FAILED",
            "Failed to read applied migrations".to_string(),
        ))?;
    Ok(names)
}

/// Bring the log schema up to date. Each step runs once, inside its own transaction.
pub fn migrate(conn: &mut Connection) -> Result<(), AppError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
           name TEXT PRIMARY KEY NOT NULL,
           applied_at TEXT NOT NULL
         );",
    )
    .map_err(db_error(
        "DB_MIGRATIONS_TABLE_FAILED",
        "Failed to create migrations table".to_string(),
    ))?;

    let applied: HashSet<String> = applied_migrations(conn)?.into_iter().collect();
    for (name, sql) in MIGRATIONS.iter().filter(|(name, _)| !applied.contains(*name)) {
        let failed = format!("Migration {name} failed");
        let tx = conn.transaction().map_err(db_error(
            "DB_TX_FAILED",
            "Failed to start migration transaction".to_string(),
        ))?;
        tx.execute_batch(sql)
            .map_err(db_error("DB_MIGRATION_FAILED", failed.clone()))?;
        tx.execute(
            "INSERT INTO _migrations(name, applied_at) \
             VALUES (?1, strftime('%Y-%m-%dT%H:%M:%fZ','now'))",
            [*name],
        )
        .map_err(db_error("DB_MIGRATION_FAILED", failed))?;
        tx.commit().map_err(db_error(
            "DB_TX_FAILED",
            "Failed to commit migration transaction".to_string(),
        ))?;
        tracing::debug!(migration = *name, "log schema step applied");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent_and_records_each_step_once() {
        let mut conn = open_in_memory().expect("open");
        migrate(&mut conn).expect("migrate");
        migrate(&mut conn).expect("migrate twice");

        assert_eq!(applied_migrations(&conn).unwrap(), vec!["0001_log_rows.sql"]);
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='log_rows'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[test]
    fn open_reports_unreachable_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = open(&dir.path().join("missing").join("logs.sqlite")).unwrap_err();
        assert_eq!(err.code, "DB_OPEN_FAILED");
        assert!(err.details.unwrap_or_default().contains("logs.sqlite"));
    }
}
