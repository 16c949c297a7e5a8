//! Todo store: SQLite connection bootstrap and schema versioning.
//!
//! Every connection handed out by this module is stamped with
//! `latest_version()` through `PRAGMA user_version`, so repositories can
//! refuse anything older or newer.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// Connection-level SQLite failure (open, pragma, transaction).
    Sqlite(rusqlite::Error),
    /// A registered migration script failed; nothing from the batch is kept.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    /// The file was written by a newer build.
    UnsupportedSchemaVersion { db_version: u32, latest_supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "migration {version} ({name}) failed: {source}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "todo store is at schema {db_version}, this build reads up to {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
