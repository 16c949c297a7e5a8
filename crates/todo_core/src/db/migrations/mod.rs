//! Schema migration registry for the `todos` store.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply every pending migration inside one transaction.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Version 2 is the one-time position backfill for legacy rows.

use crate::db::{DbError, DbResult};
use log::{info, warn};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "init",
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        name: "todo_positions",
        sql: include_str!("0002_todo_positions.sql"),
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
///
/// A database already at `latest_version()` is left untouched. A database
/// stamped with a newer version is rejected.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    apply_migrations_up_to(conn, latest_version())
}

/// Applies pending migrations up to and including `target_version`.
///
/// Used by tests that need to seed data in a legacy schema shape before the
/// remaining migrations run.
pub fn apply_migrations_up_to(conn: &mut Connection, target_version: u32) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    let target = target_version.min(latest);
    if current_version >= target {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current_version || migration.version > target {
            continue;
        }

        tx.execute_batch(migration.sql)
            .and_then(|()| {
                tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
            })
            .map_err(|source| {
                warn!(
                    "event=db_migrate module=db status=error version={} name={}",
                    migration.version, migration.name
                );
                DbError::Migration {
                    version: migration.version,
                    name: migration.name,
                    source,
                }
            })?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    Ok(())
}

/// Reads the schema version stamped on the connection.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
