use std::collections::BTreeSet;

use anyhow::Context;
use rusqlite::{Connection, Transaction};
use time::OffsetDateTime;

/// One schema step. Steps only ever add tables or columns.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

impl Migration {
    pub const fn new(version: u32, description: &'static str, up: &'static str) -> Self {
        Self {
            version,
            description,
            up,
        }
    }

    fn run(&self, tx: &Transaction<'_>) -> anyhow::Result<()> {
        tx.execute_batch(self.up)
            .with_context(|| format!("migration {} failed", self.version))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at, description) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                self.version,
                OffsetDateTime::now_utc().unix_timestamp(),
                self.description
            ],
        )?;
        Ok(())
    }
}

pub const MIGRATIONS: &[Migration] = &[
    Migration::new(
        1,
        "Users, sessions and notes with reminder state",
        include_str!("migrations/001_initial_schema.sql"),
    ),
    Migration::new(
        2,
        "Linked cloud accounts, pending OAuth states and note attachments",
        include_str!("migrations/002_cloud_attachments.sql"),
    ),
];

/// Brings the schema up to date and returns the versions that were applied,
/// in order. Each step commits on its own so a failure leaves the earlier
/// steps in place.
pub fn apply_pending_migrations(conn: &mut Connection) -> anyhow::Result<Vec<u32>> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL,
            description TEXT
        );",
    )?;

    let done = applied_versions(conn)?;
    let mut applied = Vec::new();

    for migration in MIGRATIONS.iter().filter(|m| !done.contains(&m.version)) {
        let tx = conn.transaction()?;
        migration.run(&tx)?;
        tx.commit()?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            "applied migration"
        );
        applied.push(migration.version);
    }

    Ok(applied)
}

/// Highest recorded schema version, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> anyhow::Result<u32> {
    Ok(applied_versions(conn)?.last().copied().unwrap_or(0))
}

fn applied_versions(conn: &Connection) -> anyhow::Result<BTreeSet<u32>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<BTreeSet<u32>>>()?;
    Ok(versions)
}
