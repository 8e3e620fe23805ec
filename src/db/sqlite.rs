use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use super::DatabaseError;

/// Ordered schema migrations. Versions must be strictly increasing.
const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    include_str!("../../resources/migrations/001_initial.sql"),
)];

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open the on-disk store at `path`, bringing its schema up to date.
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    prepare(Connection::open(path)?)
}

/// In-memory store with the full schema (tests, dry runs).
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    prepare(Connection::open_in_memory()?)
}

fn prepare(conn: Connection) -> Result<Connection, DatabaseError> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "foreign_keys", true)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Apply every migration newer than the recorded schema version.
///
/// Each migration runs in its own transaction together with the row that
/// records it, so an interrupted upgrade leaves the previous version intact
/// and is retried on the next open.
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current = schema_version(conn)?;

    for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        tracing::info!(version, "Applying schema migration");
        let failed = |e: rusqlite::Error| DatabaseError::MigrationFailed {
            version,
            reason: e.to_string(),
        };

        let tx = conn.unchecked_transaction().map_err(failed)?;
        tx.execute_batch(sql).map_err(failed)?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![version],
        )
        .map_err(failed)?;
        tx.commit().map_err(failed)?;
    }

    Ok(())
}

/// Highest applied migration, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let has_table = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !has_table {
        return Ok(0);
    }

    let version: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_analysis_preferences, list_patient_records, set_analysis_preferences};
    use crate::models::AnalysisParameters;

    #[test]
    fn fresh_database_is_at_latest_version() {
        let conn = open_memory_database().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 1);
    }

    #[test]
    fn unmigrated_connection_reports_version_zero() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);
    }

    #[test]
    fn rerunning_migrations_records_each_version_once() {
        let conn = open_memory_database().unwrap();
        run_migrations(&conn).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn failed_migration_leaves_no_version_row() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_version (version INTEGER PRIMARY KEY);
             CREATE TABLE patient_records (unrelated TEXT);",
        )
        .unwrap();
        // Index creation in the first migration hits the conflicting table.
        let err = run_migrations(&conn).unwrap_err();
        assert!(matches!(err, DatabaseError::MigrationFailed { version: 1, .. }));
        assert_eq!(schema_version(&conn).unwrap(), 0);
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = open_memory_database().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn reopened_file_keeps_schema_and_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinsight.db");
        {
            let conn = open_database(&path).unwrap();
            let prefs = AnalysisParameters::new(0.5, 3, false);
            set_analysis_preferences(&conn, "dr-a", &prefs).unwrap();
        }
        let conn = open_database(&path).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 1);
        let prefs = get_analysis_preferences(&conn, "dr-a").unwrap();
        assert_eq!(prefs.max_diagnoses, 3);
        assert!(!prefs.include_red_flags);
        assert!(list_patient_records(&conn, "dr-a").unwrap().is_empty());
    }
}
