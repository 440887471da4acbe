//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Apply connection pragmas from `SessionConfig`.
//! - Run caller migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have migrations fully applied.

use super::migrations::{apply_migrations, Migration};
use super::DbResult;
use crate::config::SessionConfig;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::Instant;

/// Opens a SQLite database file with default settings and applies `migrations`.
pub fn open_db(path: impl AsRef<Path>, migrations: &[Migration]) -> DbResult<Connection> {
    open_db_with(path, migrations, &SessionConfig::default())
}

/// Opens a SQLite database file using explicit settings.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db_with(
    path: impl AsRef<Path>,
    migrations: &[Migration],
    config: &SessionConfig,
) -> DbResult<Connection> {
    open_with("file", || Connection::open(path), migrations, config)
}

/// Opens an in-memory SQLite database and applies `migrations`.
pub fn open_db_in_memory(migrations: &[Migration]) -> DbResult<Connection> {
    open_with(
        "memory",
        Connection::open_in_memory,
        migrations,
        &SessionConfig::default(),
    )
}

fn open_with<F>(
    mode: &str,
    connect: F,
    migrations: &[Migration],
    config: &SessionConfig,
) -> DbResult<Connection>
where
    F: FnOnce() -> rusqlite::Result<Connection>,
{
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = connect().map_err(|err| {
        error!(
            "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
            mode,
            started_at.elapsed().as_millis(),
            err
        );
        err
    })?;

    if let Err(err) = bootstrap_connection(&mut conn, migrations, config) {
        error!(
            "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
            mode,
            started_at.elapsed().as_millis(),
            err
        );
        return Err(err);
    }

    info!(
        "event=db_open module=db status=ok mode={} duration_ms={}",
        mode,
        started_at.elapsed().as_millis()
    );
    Ok(conn)
}

fn bootstrap_connection(
    conn: &mut Connection,
    migrations: &[Migration],
    config: &SessionConfig,
) -> DbResult<()> {
    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    conn.busy_timeout(config.busy_timeout)?;
    apply_migrations(conn, migrations)?;
    Ok(())
}
