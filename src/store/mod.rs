//! Persistent Store (§4.2): the on-disk symbol/call-graph database.
//!
//! One `Store` per process, one `rusqlite::Connection` per `Store`. WAL
//! journal mode lets every process's connection read concurrently; writes
//! serialize through SQLite's own locking, backed by a busy-handler retry
//! loop so lock contention is absorbed rather than surfaced immediately.

mod ops;
pub mod schema;

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::Result;

pub use ops::{IntegrityReport, SymbolAccessor};

/// A single connection to the symbol store, configured per §4.2's
/// connection policy.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if necessary) the store at `path`, applying pending
    /// migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        configure_connection(&conn)?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Open a private in-memory store, used by tests and by short-lived
    /// tooling that doesn't need persistence.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        configure_connection(&conn)?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(Duration::from_millis(1000))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_runs_migrations() {
        let store = Store::open_in_memory().unwrap();
        let version: i64 = store
            .connection()
            .query_row("SELECT MAX(version) FROM schema_meta", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, crate::cache_dir::CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn open_on_disk_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("symbols.db");
        {
            let store = Store::open(&path).unwrap();
            store
                .connection()
                .execute(
                    "INSERT INTO engine_meta (key, value) VALUES ('k', 'v')",
                    [],
                )
                .unwrap();
        }
        let store = Store::open(&path).unwrap();
        let value: String = store
            .connection()
            .query_row(
                "SELECT value FROM engine_meta WHERE key = 'k'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(value, "v");
    }
}
