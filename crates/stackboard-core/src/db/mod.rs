//! The board store: one SQLite file under `.stackboard/`.
//!
//! File-backed connections run in WAL mode with a busy timeout, so tree
//! reads are not blocked by a committing reorder and two CLI processes
//! writing at once wait instead of failing. Every connection has foreign
//! keys on so tag rows follow their item.

pub mod migrations;
pub mod query;
pub mod schema;
pub mod write;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

/// How long a writer waits for the lock before giving up.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open the store at `path`, creating the file and its directory if needed.
///
/// # Errors
///
/// Returns an error if the directory, the file, the pragmas, or the
/// migrations fail.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let conn = Connection::open(path).with_context(|| format!("open {}", path.display()))?;
    prepare(conn, true).with_context(|| format!("prepare store {}", path.display()))
}

/// Open an existing store, or `None` when there is no file at `path`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be opened or migrated.
pub fn try_open_store(path: &Path) -> Result<Option<Connection>> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "store database missing");
        return Ok(None);
    }
    open_store(path).map(Some)
}

/// A migrated store that lives only as long as the connection.
///
/// # Errors
///
/// Returns an error if migration fails.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory store")?;
    prepare(conn, false)
}

fn prepare(mut conn: Connection, file_backed: bool) -> Result<Connection> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    if file_backed {
        // journal_mode answers with the mode it switched to.
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        tracing::debug!(%mode, "journal mode");
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    }
    migrations::migrate(&mut conn)?;
    Ok(conn)
}
