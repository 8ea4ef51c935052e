mod migration;

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use rusqlite::Connection;
use time::OffsetDateTime;

pub use migration::{MIGRATIONS, Migration, apply_pending_migrations};
use migration::schema_version;

/// Database wrapper providing connection management and schema initialization.
///
/// The connection sits behind a mutex so a single `Database` can be shared
/// between request handlers through an `Arc`. Callers should keep the guard
/// returned by [`Database::connection`] for as short a time as possible and
/// never hold it across an `.await`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens an in-memory SQLite database.
    ///
    /// Automatically applies all migrations on connection open.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::initialize(conn)
    }

    /// Opens a file-based SQLite database at the given path.
    ///
    /// Creates the database file if it does not exist.
    /// Automatically applies pending migrations on connection open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Self::initialize(conn)
    }

    fn initialize(mut conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        apply_pending_migrations(&mut conn).context("Failed to apply migrations")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Highest applied schema version.
    pub fn schema_version(&self) -> Result<u32> {
        schema_version(&self.connection())
    }

    /// Locks and returns the underlying connection.
    ///
    /// A poisoned lock is recovered: SQLite keeps its own consistency, so a
    /// panic in another handler does not invalidate the connection.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Current UTC time truncated to whole seconds, the precision stored in the
/// database.
pub(crate) fn now_utc() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(0).unwrap_or(now)
}

/// Reads a unix-seconds column as an `OffsetDateTime`.
pub(crate) fn timestamp_column(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<OffsetDateTime> {
    let secs: i64 = row.get(idx)?;
    OffsetDateTime::from_unix_timestamp(secs).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Integer, Box::new(e))
    })
}

/// Reads a nullable unix-seconds column.
pub(crate) fn optional_timestamp_column(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<OffsetDateTime>> {
    let secs: Option<i64> = row.get(idx)?;
    secs.map(|secs| {
        OffsetDateTime::from_unix_timestamp(secs).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Integer,
                Box::new(e),
            )
        })
    })
    .transpose()
}

/// Returns true when the error is a UNIQUE / PRIMARY KEY violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

#[cfg(test)]
mod tests;
