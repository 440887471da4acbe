//! Caller-supplied migration lists and their executor.
//!
//! Entity tables belong to the application embedding the repository, so the
//! migration set is passed in rather than compiled into this crate.
//!
//! # Invariants
//! - `version` values must be strictly increasing within one list.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Pending migrations are applied in a single transaction.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// One schema step identified by a monotonic version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub version: u32,
    pub sql: &'static str,
}

impl Migration {
    pub const fn new(version: u32, sql: &'static str) -> Self {
        Self { version, sql }
    }
}

/// Returns the highest version in `migrations`, or 0 for an empty list.
pub fn latest_version(migrations: &[Migration]) -> u32 {
    migrations.last().map_or(0, |migration| migration.version)
}

/// Returns the schema version currently recorded on the connection.
pub fn current_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Applies all migrations newer than the connection's `user_version`.
pub fn apply_migrations(conn: &mut Connection, migrations: &[Migration]) -> DbResult<()> {
    ensure_monotonic(migrations)?;

    let current = current_version(conn)?;
    let latest = latest_version(migrations);

    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }

    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    let mut applied = 0usize;
    for migration in migrations.iter().filter(|m| m.version > current) {
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
        applied += 1;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} applied={}",
        current, latest, applied
    );
    Ok(())
}

fn ensure_monotonic(migrations: &[Migration]) -> DbResult<()> {
    for pair in migrations.windows(2) {
        if pair[1].version <= pair[0].version {
            return Err(DbError::InvalidMigrationOrder {
                previous: pair[0].version,
                next: pair[1].version,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, current_version, latest_version, Migration};
    use crate::db::DbError;
    use rusqlite::Connection;

    const STEPS: &[Migration] = &[
        Migration::new(1, "CREATE TABLE a (id INTEGER PRIMARY KEY);"),
        Migration::new(2, "CREATE TABLE b (id INTEGER PRIMARY KEY);"),
    ];

    #[test]
    fn latest_version_of_empty_list_is_zero() {
        assert_eq!(latest_version(&[]), 0);
        assert_eq!(latest_version(STEPS), 2);
    }

    #[test]
    fn applies_only_pending_steps() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn, &STEPS[..1]).unwrap();
        assert_eq!(current_version(&conn).unwrap(), 1);

        apply_migrations(&mut conn, STEPS).unwrap();
        assert_eq!(current_version(&conn).unwrap(), 2);
    }

    #[test]
    fn rejects_out_of_order_versions() {
        let mut conn = Connection::open_in_memory().unwrap();
        let steps = [STEPS[1], STEPS[0]];
        let err = apply_migrations(&mut conn, &steps).unwrap_err();
        assert!(matches!(
            err,
            DbError::InvalidMigrationOrder {
                previous: 2,
                next: 1
            }
        ));
        assert_eq!(current_version(&conn).unwrap(), 0);
    }

    #[test]
    fn failed_step_rolls_back_whole_batch() {
        let mut conn = Connection::open_in_memory().unwrap();
        let steps = [STEPS[0], Migration::new(2, "CREATE TABLE broken (")];
        assert!(apply_migrations(&mut conn, &steps).is_err());
        assert_eq!(current_version(&conn).unwrap(), 0);
    }
}
