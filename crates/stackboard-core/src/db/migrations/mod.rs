//! Versioned schema upgrades for the board store.
//!
//! `PRAGMA user_version` records the last applied step. Steps run in order,
//! each in its own transaction together with the version bump, so a crash
//! leaves the store at a whole version. A store written by a newer binary is
//! refused rather than read with a schema this build does not know.

use super::schema;
use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use tracing::{debug, info};

/// One schema step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

/// Every schema step, oldest first.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "core tables",
        sql: schema::MIGRATION_V1_SQL,
    },
    Migration {
        version: 2,
        name: "partition and filter indexes",
        sql: schema::MIGRATION_V2_SQL,
    },
];

/// Schema version a freshly migrated store ends up at.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

/// Versions before and after a [`migrate`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub from: u32,
    pub to: u32,
}

impl MigrationOutcome {
    #[must_use]
    pub const fn upgraded(self) -> bool {
        self.to > self.from
    }
}

/// The store's schema version.
///
/// # Errors
///
/// Returns an error if the pragma cannot be read or is negative.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    let raw: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("read user_version")?;
    u32::try_from(raw).with_context(|| format!("invalid user_version {raw}"))
}

/// Bring the store up to [`LATEST_SCHEMA_VERSION`].
///
/// # Errors
///
/// Returns an error if the store is newer than this build or a step fails.
pub fn migrate(conn: &mut Connection) -> Result<MigrationOutcome> {
    let from = schema_version(conn)?;
    if from > LATEST_SCHEMA_VERSION {
        bail!(
            "store schema v{from} is newer than this build supports (v{LATEST_SCHEMA_VERSION}); upgrade sb"
        );
    }

    for step in MIGRATIONS.iter().filter(|m| m.version > from) {
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)
            .with_context(|| format!("migration v{} ({})", step.version, step.name))?;
        tx.pragma_update(None, "user_version", i64::from(step.version))?;
        tx.commit()?;
        debug!(version = step.version, name = step.name, "schema step applied");
    }

    let outcome = MigrationOutcome {
        from,
        to: LATEST_SCHEMA_VERSION,
    };
    if outcome.upgraded() {
        info!(from, to = outcome.to, "store schema upgraded");
    }
    Ok(outcome)
}
